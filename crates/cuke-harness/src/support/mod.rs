//! Support-code registration and the built, queryable library.

mod builder;
mod library;
mod world;

pub use builder::{HookOptions, ParameterTypeOptions, SupportCodeBuilder};
pub use library::{
    DefinedHook, DefinedParameterType, DefinedStep, MatchedStep, SupportCodeLibrary,
};
pub use world::{World, WorldCreator, WorldDestroyer, WorldFactory};
