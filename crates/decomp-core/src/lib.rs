pub mod errors;
pub mod events;
pub mod identity;
pub mod ids;
pub mod item_type;
pub mod node;
pub mod rules;
pub mod settings;
pub mod store;

pub use errors::RemoteError;
pub use ids::{NodeId, RemoteId, RunId};
pub use item_type::WorkItemTypeName;
pub use node::{HierarchyTree, WorkItemNode};
pub use rules::HierarchyRuleSet;
