//! Specification-by-example testing: specs are HTML documents whose prose is
//! bound to a fixture through attributes in a dedicated namespace
//! (`http://www.concordion.org/2007/concordion`).
//!
//! Processing a spec builds a command tree over the annotated elements, runs
//! it against the fixture, rewrites the document in place with
//! success/failure/exception markup, and reduces it to a [`Summary`].
//!
//! ```
//! use exemplar::{MapFixture, Runner, Value, FixtureError};
//!
//! let source = r#"<html xmlns:concordion="http://www.concordion.org/2007/concordion">
//! <body>
//!   <p concordion:execute="greeting = greet(#name)">
//!     Greeting <span concordion:set="name">World</span> produces
//!     <span concordion:assertEquals="greeting">Hello World!</span>
//!   </p>
//! </body>
//! </html>"#;
//!
//! let mut fixture = MapFixture::new().method("greet", |args| match args {
//!     [Value::Str(name)] => Ok(Value::Str(format!("Hello {name}!"))),
//!     _ => Err(FixtureError::new("greet takes one string")),
//! });
//!
//! let processed = Runner::new().process_str(source, &mut fixture).unwrap();
//! assert!(processed.summary.has_succeeded());
//! ```

mod assets;
mod command;
mod decorate;
pub mod dom;
mod encode;
mod error;
mod expr;
mod fixture;
mod runner;
mod summary;
mod value;

pub use command::{element_content, normalize, Command, CommandKind, COMMAND_NS};
pub use dom::Document;
pub use error::Error;
pub use expr::{evaluate, parse, Decomposed, EvalError, Expr};
pub use fixture::{Fixture, FixtureError, MapFixture, TEXT_KEY};
pub use runner::{Processed, Runner};
pub use summary::{ResultEvent, Summary};
pub use value::Value;
