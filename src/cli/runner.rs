use tracing::info;
use tracing_subscriber::EnvFilter;

use cogcat::types::is_subdataset_string;
use cogcat::{
    AssetDescriptor, CatalogParams, CatalogRequest, CollectionRegistry, auto_item_id,
    build_catalog,
};

use super::args::CliArgs;
use super::errors::AppError;

/// Turn command-line entries into descriptors. Plain entries may carry several
/// comma-separated paths; subdataset strings are kept whole.
pub fn parse_inputs(raw: &[String]) -> Vec<AssetDescriptor> {
    let mut out = Vec::new();
    for entry in raw {
        if is_subdataset_string(entry) {
            out.push(AssetDescriptor::Subdataset(entry.clone()));
            continue;
        }
        out.extend(
            entry
                .split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(AssetDescriptor::parse),
        );
    }
    out
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

pub fn run(args: CliArgs) -> Result<(), AppError> {
    if args.log {
        init_logging();
    }

    let params = match &args.config {
        Some(path) => CatalogParams::from_json_file(path)?,
        None => CatalogParams::default(),
    };
    let registry = match &args.registry {
        Some(path) => CollectionRegistry::from_json_file(path)?,
        None => CollectionRegistry::default(),
    };

    let inputs = parse_inputs(&args.inputs);
    if inputs.is_empty() {
        return Err(AppError::NoInputs);
    }

    let (item_id, counter) = if args.auto_item_id {
        let service_uid = args.service_uid.as_deref().ok_or(AppError::MissingArgument {
            arg: "--service-uid".to_string(),
        })?;
        let (id, counter) = auto_item_id(&args.output_dir, service_uid);
        (id, Some(counter))
    } else {
        let id = args.item_id.clone().ok_or(AppError::MissingArgument {
            arg: "--item-id or --auto-item-id".to_string(),
        })?;
        (id, None)
    };

    let request = CatalogRequest {
        inputs,
        output_dir: args.output_dir.clone(),
        collection_id: args.collection_id.clone(),
        item_id,
        counter,
    };
    let output = build_catalog(&request, &params, &registry)?;

    info!(
        "Created item {} with {} raster asset(s)",
        output.item.id,
        output.rasters.len()
    );
    println!("{}", output.item_path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comma_and_space_separated_inputs() {
        let raw = vec![
            "a.tif,b.tif".to_string(),
            r#"HDF5:"geo/geo_velocity.h5"://velocityStd"#.to_string(),
            "c.nc,".to_string(),
        ];
        let parsed = parse_inputs(&raw);
        assert_eq!(parsed.len(), 4);
        assert!(matches!(&parsed[2], AssetDescriptor::Subdataset(s) if s.ends_with("velocityStd")));
        assert!(matches!(&parsed[3], AssetDescriptor::Path(p) if p.to_str() == Some("c.nc")));
    }
}
