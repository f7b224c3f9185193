#![doc = r##"
cogcat: normalize heterogeneous rasters into Cloud-Optimized GeoTIFFs and
publish them as a STAC collection and item.

Given plain rasters, multi-array containers (NetCDF/HDF5) or GDAL subdataset
strings, cogcat:

1. validates the item id against the collection registry,
2. expands every input into one or more COGs under `assets/<collection>/<item>/`,
3. backfills missing georeferencing from the first georeferenced raster of the
   same pixel size,
4. warps everything into the canonical working CRS,
5. unions the asset footprints in the public CRS (EPSG:4326 by default),
6. renders a JPEG quicklook of the first raster,
7. writes `items/<collection>/collection.json` and
   `items/<collection>/<item>/<item>.json` with relative links.

Requirements
------------
- GDAL development headers and runtime (with the COG driver) available on your system.
- Rust 2024 edition toolchain.

Quick start
-----------
```rust,no_run
use std::path::PathBuf;
use cogcat::{build_catalog, AssetDescriptor, CatalogParams, CatalogRequest, CollectionRegistry};

fn main() -> cogcat::Result<()> {
    let request = CatalogRequest {
        inputs: vec![
            AssetDescriptor::parse("/data/geo_velocity.tif"),
            AssetDescriptor::parse(r#"HDF5:"/data/geo_velocity.h5"://velocityStd"#),
        ],
        output_dir: PathBuf::from("/catalog"),
        collection_id: "LS-DF".to_string(),
        item_id: "LS-DF-SB-S1_20251217T144338d086".to_string(),
        counter: None,
    };
    let out = build_catalog(&request, &CatalogParams::default(), &CollectionRegistry::default())?;
    println!("{}", out.item_path.display());
    Ok(())
}
```

Error handling
--------------
All public functions return `cogcat::Result<T>`; match on `cogcat::Error` to
handle specific cases.

```rust,no_run
use cogcat::{Error, CollectionRegistry, core::identifier::validate};

fn main() {
    let registry = CollectionRegistry::default();
    match validate("FS-FM-TC_20250101", "LS-DF", &registry) {
        Ok(id) => println!("valid: {id}"),
        Err(Error::DisallowedNamespace { service_uid, .. }) => {
            eprintln!("not allowed: {service_uid}")
        }
        Err(other) => eprintln!("invalid: {other}"),
    }
}
```

Useful modules
--------------
- [`api`]: high-level entry points.
- [`core`]: the individual catalog stages.
- [`types`]: shared domain types.
- [`io`]: GDAL reader, COG utilities and writers.
- [`error`]: crate-level `Error` and `Result`.
"##]

// Core modules (public)
pub mod api;
pub mod core;
pub mod error;
pub mod io;
pub mod types;

// Curated public API surface
// Types
pub use crate::core::identifier::ItemId;
pub use crate::core::params::{CatalogParams, ProcessingInfo};
pub use crate::core::registry::{CollectionInfo, CollectionRegistry};
pub use error::{Error, Result};
pub use types::{
    AssetClass, AssetDescriptor, Bounds, Georeference, GriddedDataset, MediaType,
    NormalizedRaster, ReferenceGeoreference,
};

// Readers
pub use io::gdal::{GdalError, RasterMetadata, RasterReader};

// High-level API re-exports
pub use api::{CatalogOutput, CatalogRequest, auto_item_id, build_catalog, generate_item_id};
