pub mod constraints;
pub mod node;
pub mod pod;
pub mod quantities;

pub use constraints::{
    MatchExpression, NodeAffinity, NodeSelectorTerm, SelectorOperator, Taint, TaintEffect,
    Toleration, TolerationOperator,
};
pub use node::NodeInfo;
pub use pod::{PodInfo, QosClass, DEFAULT_NAMESPACE};
pub use quantities::ResourceQuantities;
