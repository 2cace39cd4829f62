//! hs-graph: component model and connection registry for homesim.
//!
//! Provides:
//! - Typed ports and the [`Component`] contract
//! - [`Assembly`], the connection registry used while wiring a system
//!   (explicit, predefined and dynamic connections)
//! - Validation and freezing into an immutable [`Graph`]
//! - Deterministic [`EvaluationOrder`] with cycle detection
//! - Evaluation and preparation contexts
//!
//! # Example
//!
//! ```
//! use hs_core::{LoadType, Unit};
//! use hs_graph::{
//!     Assembly, AssemblyOptions, Component, ComponentResult, EvalContext, GraphResult,
//!     PortDeclarer, PortSpec,
//! };
//!
//! struct Source;
//! struct Sink;
//!
//! impl Component for Source {
//!     fn name(&self) -> &str { "Source" }
//!     fn declare_ports(&mut self, ports: &mut PortDeclarer<'_>) -> GraphResult<()> {
//!         ports.output(PortSpec::new("Power", LoadType::Electricity, Unit::Watt))?;
//!         Ok(())
//!     }
//!     fn evaluate(&mut self, _ctx: &mut EvalContext<'_>) -> ComponentResult<()> { Ok(()) }
//! }
//!
//! impl Component for Sink {
//!     fn name(&self) -> &str { "Sink" }
//!     fn declare_ports(&mut self, ports: &mut PortDeclarer<'_>) -> GraphResult<()> {
//!         ports.input(PortSpec::new("Power", LoadType::Electricity, Unit::Watt))?;
//!         Ok(())
//!     }
//!     fn evaluate(&mut self, _ctx: &mut EvalContext<'_>) -> ComponentResult<()> { Ok(()) }
//! }
//!
//! let mut asm = Assembly::new();
//! let source = asm.add_component(Source).unwrap();
//! let sink = asm.add_component(Sink).unwrap();
//! asm.connect(sink, "Power", source, "Power").unwrap();
//! let system = asm.finish(&AssemblyOptions::default()).unwrap();
//!
//! assert_eq!(system.graph().connections().len(), 1);
//! ```

pub mod builder;
pub mod component;
pub mod connection;
pub mod context;
pub mod error;
pub mod graph;
pub mod order;
pub mod port;
pub mod validate;

// Re-exports for ergonomics
pub use builder::{AssembledSystem, Assembly};
pub use component::{Component, PortDeclarer, PredefinedConnection};
pub use connection::{
    Connection, ConnectionOrigin, DynamicInputSpec, DynamicOutputSlot, DynamicOutputSpec,
    resolve_by_tag_and_weight,
};
pub use context::{EvalContext, PrepareContext};
pub use error::{ComponentError, ComponentResult, GraphError, GraphResult};
pub use graph::{ComponentInfo, Graph};
pub use order::EvaluationOrder;
pub use port::{PortDescriptor, PortDirection, PortSpec};
pub use validate::{AssemblyOptions, DanglingSlotPolicy};
