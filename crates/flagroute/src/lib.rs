//! Command-line token parsing with a fluent declaration API and handler dispatch.
//!
//! # Example
//!
//! ```rust,ignore
//! use flagroute::{Command, Handlers, Params, ParseOutcome};
//!
//! let mut cmd = Command::with_name("deploy");
//! cmd.flag("e").alias("env").default("dev");
//! cmd.flag("go").boolean().needs(["e"]).run("deploy");
//!
//! match cmd.parse(std::env::args())? {
//!     ParseOutcome::Help(text) => print!("{text}"),
//!     ParseOutcome::Matches(m) => {
//!         let mut handlers = Handlers::new().on("deploy", |params: Params| {
//!             println!("deploying to {}", params["e"]);
//!         });
//!         m.dispatch(&mut handlers)?;
//!     }
//! }
//! ```

pub mod command;
pub mod dispatch;
mod engine;
pub mod error;
pub mod files;
pub mod help;
pub mod key;
pub mod matches;
pub mod opt;
pub mod registry;
pub mod token;
pub mod value;

pub use command::{Command, OptionBuilder, ParseOutcome};
pub use dispatch::{Dispatch, DispatchError, Handler, Handlers, Params, Selection};
pub use error::{ErrorKind, ParseError, ParseResult};
pub use files::FileRequirements;
pub use key::{Key, OptionKind};
pub use matches::Matches;
pub use opt::Opt;
pub use value::Value;

pub use flagroute_metadata::{CommandMeta, OptionMeta};
