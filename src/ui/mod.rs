//! Terminal output for the modcache CLI
//!
//! Uses `cliclack` for prompts and spinners when attached to a terminal and
//! falls back to plain, prefix-tagged lines in CI or when piped.
//!
//! # Example
//!
//! ```rust,ignore
//! use modcache::ui::{self, TaskSpinner, UiContext};
//!
//! let ctx = UiContext::detect();
//!
//! let mut spinner = TaskSpinner::new(&ctx);
//! spinner.start("Checking 120 cached files...");
//! // ... invalidate ...
//! spinner.stop("3 paths changed");
//!
//! ui::path_list(&ctx, "Invalidated", &paths);
//! ```

mod context;
mod output;
mod progress;
mod prompts;
mod theme;

pub use context::UiContext;
pub use output::{
    key_value, path_list, remark, section, step_error_detail, step_info, step_ok,
    step_ok_detail, step_warn_hint,
};
pub use progress::TaskSpinner;
pub use prompts::confirm;
pub use theme::{init_theme, ModcacheTheme};
