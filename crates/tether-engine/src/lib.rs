//! Tether Engine - overload resolution and value marshaling
//!
//! Lets a string-typed script layer call members of a typed host object
//! model:
//!
//! - **matcher**: bind each candidate overload against the actual arguments
//! - **ranker**: order the successful bindings by count and type depth
//! - **marshal**: convert arguments to host values and results back to text
//!   or object handles
//! - **writeback**: store by-ref results in script variables
//! - **invoke**: the full resolve, select, call, write-back pipeline
//!
//! # Example
//!
//! ```ignore
//! use tether_engine::{BindRequest, Engine, EngineConfig};
//!
//! let engine = Engine::new(EngineConfig::default())?;
//! let bindings = engine.resolve_and_bind(&host, &BindRequest::new(&candidates).named("Add").with_args(&args))?;
//! let ordered = engine.reorder(host.types(), &candidates, bindings, engine.reorder_flags())?;
//! ```

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod invoke;
pub mod marshal;
pub mod matcher;
pub mod ranker;
mod trace;
pub mod writeback;

pub use config::{ConfigError, EngineConfig};
pub use error::{BindError, BindResult, ErrorKind};
pub use invoke::{CallOutcome, CallRequest};
pub use marshal::{Direction, FromNativeOptions, InterfacePriority, Marshaler, Slot};
pub use matcher::{BindRequest, Binding, BindingRules, OutputArgument};
pub use writeback::WritebackOptions;

use std::sync::atomic::AtomicU64;
use tether_sdk::{ArgumentValue, Host, MarshalFlags, NativeValue, ObjectFlags, ReorderFlags};
use tether_types::TypeId;

/// The binding engine
///
/// Holds only immutable configuration and the handle name counter; all
/// interpreter state is reached through the [`Host`] passed to each call.
#[derive(Debug)]
pub struct Engine {
    config: EngineConfig,
    marshal_flags: MarshalFlags,
    reorder_flags: ReorderFlags,
    object_flags: ObjectFlags,
    handle_counter: AtomicU64,
}

impl Engine {
    /// Create an engine from a validated configuration
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let marshal_flags = config.marshal_flags()?;
        let reorder_flags = config.reorder_flags()?;
        let object_flags = config.object_flags()?;
        tracing::debug!(
            marshal = %marshal_flags,
            reorder = %reorder_flags,
            object = %object_flags,
            "engine created"
        );
        Ok(Self {
            config,
            marshal_flags,
            reorder_flags,
            object_flags,
            handle_counter: AtomicU64::new(0),
        })
    }

    /// Active configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Default marshal flags
    pub fn marshal_flags(&self) -> MarshalFlags {
        self.marshal_flags
    }

    /// Default reorder flags
    pub fn reorder_flags(&self) -> ReorderFlags {
        self.reorder_flags
    }

    /// Default object table entry flags
    pub fn object_flags(&self) -> ObjectFlags {
        self.object_flags
    }

    /// Marshaler bound to a host
    pub fn marshaler<'e>(&'e self, host: &'e dyn Host) -> Marshaler<'e> {
        Marshaler::new(host, &self.config, self.object_flags, &self.handle_counter)
    }

    /// Convert one free-standing value to `target`
    pub fn to_native(
        &self,
        host: &dyn Host,
        arg: &ArgumentValue,
        target: TypeId,
        direction: Direction,
        flags: MarshalFlags,
    ) -> BindResult<NativeValue> {
        self.marshaler(host).to_native(arg, target, direction, flags, Slot::value())
    }

    /// Render a host value as a literal or object handle
    pub fn from_native(&self, host: &dyn Host, value: &NativeValue, options: &FromNativeOptions) -> BindResult<String> {
        self.marshaler(host).from_native(value, options)
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self {
            config: EngineConfig::default(),
            marshal_flags: MarshalFlags::NONE,
            reorder_flags: ReorderFlags::DEFAULT,
            object_flags: ObjectFlags::NONE,
            handle_counter: AtomicU64::new(0),
        }
    }
}
