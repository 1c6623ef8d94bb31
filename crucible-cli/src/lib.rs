//! Command surface for composing and launching `crucible` training
//! experiments: the clap application, the verb router and the
//! process-level adapters behind the execution collaborator traits.

#[macro_use]
extern crate log;
#[macro_use]
extern crate serde;

pub mod cli;
pub mod router;
pub mod runtime;
