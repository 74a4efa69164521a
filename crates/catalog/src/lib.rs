//! opforge Operation Catalog
//!
//! Link-time registry of operation declarations plus the standard catalog:
//!
//! | Operation | Category | Shape |
//! |-----------|----------|-------|
//! | `min` | math | elementwise, parallel |
//! | `sqrt` | math | elementwise, float only, parallel |
//! | `array_sum` | array | reduction |
//! | `array_intersect` | array | membership with runtime stride |
//! | `concat_string` | string | growable result |
//! | `bound_check_less_than_predicate_add` | bounds | fused predicate |
//! | `complex_divide` | complex | elementwise, fixed size, slow, parallel |

pub mod array;
pub mod bounds;
pub mod complex;
pub mod math;
pub mod registry;
pub mod string;

pub use linkme;
pub use registry::{
    BuildReport, DeclareFn, OPERATIONS, OperationEntry, all_names, build_all, build_where, declare,
    get, is_known,
};
