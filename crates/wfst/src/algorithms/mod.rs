// Algorithms over mutable automata.
//
// Each submodule holds one operation family; the common entry points are
// re-exported here.

pub mod arc_sort;
pub mod beam;
pub mod closure;
pub mod connect;
pub mod equal;
pub mod project;
pub mod relabel;
pub mod rmepsilon;
pub mod shortest_path;
pub mod strings;
pub mod verify;

pub use arc_sort::{ArcSortType, arc_sort};
pub use beam::{BeamPath, beam_search};
pub use closure::{ClosureType, closure, closure_star};
pub use connect::connect;
pub use equal::equal;
pub use project::{ProjectType, project, project_input, project_output};
pub use relabel::convert_symbols;
pub use rmepsilon::{RmEpsilonConfig, rm_epsilon, rm_epsilon_with_config};
pub use shortest_path::{
    ShortestPathConfig, shortest_distance, shortest_path, shortest_path_with_config,
};
pub use strings::{
    add_labels, add_string, add_translation, add_wstring, get_output_string, get_string,
    wget_string,
};
pub use verify::verify;
