use std::path::Path;

use serde_json::json;

use crate::error::Result;
use crate::output::{self, Format};
use crate::store::repo::Repo;

pub fn run(root: &Path, format: Format) -> Result<()> {
    let layout = Repo::init(root)?;
    match format {
        Format::Json => output::print_success(json!({
            "data_dir": layout.data_dir(),
            "config": layout.config_path(),
        }))?,
        Format::Pretty => {
            output::print_message(&format!("Initialized .protask/ in {}", root.display()))
        }
    }
    Ok(())
}
