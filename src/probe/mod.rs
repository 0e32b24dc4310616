pub mod handlers;
pub mod node;
pub mod sampler;
pub mod synthetic;

pub use handlers::Probes;
pub use node::NodeIdFn;
pub use sampler::SamplingPolicy;
pub use synthetic::SyntheticLoad;
