//! Configuration section definitions.
//!
//! | Module    | TOML Section  | Purpose                                  |
//! |-----------|---------------|------------------------------------------|
//! | `build`   | `[build]`     | Entries, output, targets, inline limit   |
//! | `html`    | `[html]`      | Emitted `index.html`                     |
//! | `resolve` | `[resolve]`   | Aliases, extensions, Node fallbacks      |
//! | `chunks`  | `[[chunks]]`  | Cache groups for vendor bundles          |
//! | `check`   | `[check]`     | Advisory checker                         |
//! | `serve`   | `[serve]`     | Development server                       |

mod build;
mod check;
mod chunks;
mod html;
mod resolve;
mod serve;

pub use build::{BuildConfig, TargetsConfig};
pub use check::CheckConfig;
pub use chunks::{ChunkGroupConfig, default_chunk_groups, validate_chunk_groups};
pub use html::HtmlConfig;
pub use resolve::{Fallback, ResolveConfig};
pub use serve::ServeConfig;
