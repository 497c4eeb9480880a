//! `linkscout sites`: list the configured site registry.

use crate::cli::output::{self, Styled};
use crate::config::ScoutConfig;
use anyhow::Result;
use std::path::Path;

pub async fn run(config_path: Option<&Path>) -> Result<()> {
    let config = ScoutConfig::load(config_path)?;

    if output::is_json() {
        output::print_json(&serde_json::to_value(&config.sites)?);
        return Ok(());
    }
    if output::is_quiet() {
        for site in &config.sites {
            println!("{}", site.id);
        }
        return Ok(());
    }

    let s = Styled::new();
    output::print_header(&s);
    for site in &config.sites {
        output::print_check(s.info_sym(), &site.id, &s.cyan(&site.domain));
        for template in &site.search_templates {
            output::print_detail(&s.dim(template));
        }
    }
    Ok(())
}
