pub mod actions;
pub mod clipboard;
pub mod codec;
pub mod config;
pub mod engine;
pub mod error;
pub mod index;
pub mod keyboard;
pub mod matcher;
pub mod models;
pub mod template;

// Re-export common items for convenience
pub use actions::{build_actions, ExpansionAction};
pub use clipboard::{ClipboardAccess, SystemClipboard};
pub use config::{ensure_config_dir, get_config_dir, get_db_file_path, is_daemon_running};
pub use engine::{ExpansionEngine, NullStats, OutputSink, StatisticsSink};
pub use error::{KlexError, Result};
pub use index::{HotstringStore, IndexHandle, TriggerIndex};
pub use matcher::{ExpansionContext, KeyEvent, KeyOutcome, KeyStroke, MatchBuffer, Modifiers, TriggerKey};
pub use models::{Bundle, EngineConfig, SendMode, StoredHotstring, TriggerClass, UsageStats};
pub use template::{expand, ExpandedTemplate, PromptSource, SilentPrompt, SCRIPT_MARKER};
