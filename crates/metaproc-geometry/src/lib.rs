//! Polygon counting for glTF artifacts.
//!
//! Decoding is delegated to the `gltf` crate; this crate only walks the
//! raw scene graph and counts triangles per primitive draw mode.
//!
//! # Example
//!
//! ```
//! use metaproc_geometry::{ToleranceCheck, check_tolerance};
//!
//! // 2% tolerance on 100 declared polygons allows two extra.
//! assert_eq!(check_tolerance(100, 102, 200), ToleranceCheck::WithinTolerance { diff: 2 });
//! assert!(check_tolerance(100, 103, 200).is_exceeded());
//! ```

pub use self::count::{
    count_document_polygons, count_polygons, count_root_polygons, polygons_for_mode,
};
pub use self::error::{GeometryError, Result};
pub use self::tolerance::{ToleranceCheck, check_tolerance};

mod count;
mod error;
mod tolerance;
