use std::path::PathBuf;

use tracing::debug;

use crate::{
    config::IngestorConfig,
    errors::Error,
    models::request_params::{RequestOptions, SeriesRequestParams},
    resolve::{
        AliasMap, CodeCatalog, CuSeriesCatalog, Resolution, catalog::DEFAULT_MASTER_LIST, load_mapping,
        resolve,
    },
};

use super::commands::FetchArgs;

impl FetchArgs {
    pub fn request_options(&self) -> RequestOptions {
        RequestOptions {
            catalog: self.catalog,
            calculations: self.calculations,
            annualaverage: self.annualaverage,
            aspects: self.aspects,
        }
    }

    /// Request for the resolved `codes` over this invocation's year span.
    pub fn request_params(&self, codes: Vec<String>) -> SeriesRequestParams {
        SeriesRequestParams::new(codes, self.start, self.end).with_options(self.request_options())
    }

    /// `--mapping` overrides `[mapping].path`; otherwise the fallback search runs.
    pub fn load_aliases(&self, cfg: &IngestorConfig) -> AliasMap {
        let explicit = self.mapping.as_deref().or(cfg.mapping.path.as_deref());
        load_mapping(explicit, &cfg.mapping.search_dirs)
    }

    /// The master list from `--catalog-file`, `[catalog].master_list`, or the
    /// working directory. `None` when the file is absent or unreadable.
    pub fn load_catalog(&self, cfg: &IngestorConfig) -> Option<CuSeriesCatalog> {
        let path = self
            .catalog_file
            .clone()
            .or_else(|| cfg.catalog.master_list.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_MASTER_LIST));
        match CuSeriesCatalog::load(&path) {
            Ok(cat) => Some(cat),
            Err(e) => {
                debug!("series catalog unavailable: {e}");
                None
            }
        }
    }

    /// Resolves the positional tokens. The catalog is only read when a `CU:`
    /// token is present.
    pub fn resolve(&self, cfg: &IngestorConfig) -> Result<Resolution, Error> {
        self.resolve_with(cfg, &self.load_aliases(cfg))
    }

    /// Like [`FetchArgs::resolve`] with a caller-supplied alias map.
    pub fn resolve_with(&self, cfg: &IngestorConfig, aliases: &AliasMap) -> Result<Resolution, Error> {
        let needs_catalog = self
            .codes
            .iter()
            .any(|t| t.trim().get(..3).is_some_and(|p| p.eq_ignore_ascii_case("CU:")));
        let catalog = needs_catalog.then(|| self.load_catalog(cfg)).flatten();
        let resolution = resolve(
            &self.codes,
            aliases,
            catalog.as_ref().map(|c| c as &dyn CodeCatalog),
        )?;
        debug!(codes = resolution.codes.len(), "resolved tokens");
        Ok(resolution)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn explicit_mapping_flag_wins_over_config() {
        let dir = TempDir::new().unwrap();
        let from_flag = dir.path().join("flag.csv");
        let from_cfg = dir.path().join("cfg.csv");
        std::fs::write(&from_flag, "alias,series\nfood,CUUR0000SAF1\n").unwrap();
        std::fs::write(&from_cfg, "alias,series\nenergy,CUUR0000SA0E\n").unwrap();

        let mut cfg = IngestorConfig::default();
        cfg.mapping.path = Some(from_cfg);
        let args = FetchArgs {
            codes: vec!["food".into(), "CUUR0000SA0".into()],
            mapping: Some(from_flag),
            ..Default::default()
        };

        let res = args.resolve(&cfg).unwrap();
        assert_eq!(res.codes, vec!["CUUR0000SAF1", "CUUR0000SA0"]);
        assert!(args.resolve(&IngestorConfig::default()).is_ok());
    }

    #[test]
    fn cu_tokens_use_catalog_file() {
        let dir = TempDir::new().unwrap();
        let master = dir.path().join("master.csv");
        std::fs::write(
            &master,
            "series_id,area_code,seasonal\nCUUR0000SA0,0000,U\nCUSR0000SA0,0000,S\n",
        )
        .unwrap();
        let args = FetchArgs {
            codes: vec!["cu:seasonal=S".into()],
            catalog_file: Some(master),
            start: Some(2024),
            end: Some(2020),
            catalog: true,
            ..Default::default()
        };
        let mut cfg = IngestorConfig::default();
        cfg.mapping.search_dirs = vec![dir.path().to_path_buf()];

        let res = args.resolve(&cfg).unwrap();
        assert_eq!(res.codes, vec!["CUSR0000SA0"]);

        let params = args.request_params(res.codes);
        assert!(params.options.catalog);
        assert_eq!((params.start_year, params.end_year), (Some(2024), Some(2020)));
    }
}
