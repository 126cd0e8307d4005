use rustc_hash::FxHashMap;
use tracing::debug;

use crate::config::{parse_options, BuildContext, CommonOptions};
use crate::error::ConfigError;
use crate::generator::{Generator, GeneratorKind, Mask};
use crate::generators::analysis::AnalysisGen;
use crate::generators::bedrock::BedrockGen;
use crate::generators::caves::CavesGen;
use crate::generators::merger::MergerGen;
use crate::generators::natural::NaturalGen;
use crate::generators::ores::OresGen;
use crate::generators::snow::SnowGen;
use crate::generators::splat::SplatGen;
use crate::generators::thaw::ThawGen;
use crate::generators::torches::TorchGen;
use crate::generators::vegetation::VegetationGen;
use crate::generators::water::WaterGen;
use crate::weightmap::Weightmap;

/// Builds the kind-specific part of a generator from its option table.
pub type Factory = fn(&toml::Table, &BuildContext) -> Result<GeneratorKind, ConfigError>;

/// Maps configuration kind names to generator factories.
pub struct GeneratorRegistry {
    factories: FxHashMap<&'static str, Factory>,
}

impl GeneratorRegistry {
    pub fn new() -> Self {
        Self {
            factories: FxHashMap::default(),
        }
    }

    /// A registry with every built-in generator kind.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register("bedrock", BedrockGen::build);
        registry.register("caves", CavesGen::build);
        registry.register("ores", OresGen::build);
        registry.register("splat", SplatGen::build);
        registry.register("snow", SnowGen::build);
        registry.register("deice", ThawGen::build);
        registry.register("naturalize", NaturalGen::build);
        registry.register("vegetation", VegetationGen::build);
        registry.register("torches", TorchGen::build);
        registry.register("water", WaterGen::build);
        registry.register("merger", MergerGen::build);
        registry.register("analysis", AnalysisGen::build);
        registry
    }

    pub fn register(&mut self, kind: &'static str, factory: Factory) {
        if self.factories.insert(kind, factory).is_some() {
            debug!("Replaced generator factory '{kind}'");
        }
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.factories.contains_key(kind)
    }

    pub fn kinds(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.factories.keys().copied()
    }

    /// Builds one generator, applying the options every kind shares.
    pub fn create(
        &self,
        kind: &str,
        table: &toml::Table,
        ctx: &BuildContext,
    ) -> Result<Generator, ConfigError> {
        let factory = self
            .factories
            .get(kind)
            .ok_or_else(|| ConfigError::UnknownKind(kind.to_string()))?;
        let common: CommonOptions = parse_options(kind, table)?;
        let built = factory(table, ctx)?;

        let mut generator = Generator::new(kind, built, ctx.version(), ctx.seed);
        if let Some(passes) = common.passes {
            if passes == 0 {
                return Err(ConfigError::InvalidValue {
                    kind: kind.to_string(),
                    field: "passes",
                    reason: "must be at least 1".to_string(),
                });
            }
            generator = generator.with_passes(passes);
        }
        if let Some(priority) = common.priority {
            generator = generator.with_priority(priority);
        }
        if let Some(mask) = common.mask {
            let map = Weightmap::load(
                &ctx.resolve(&mask.file),
                mask.channel,
                ctx.bounds.len_x(),
                ctx.bounds.len_z(),
            )?;
            generator = generator.with_mask(Mask::new(map, ctx.bounds));
        }
        Ok(generator)
    }
}

impl Default for GeneratorRegistry {
    fn default() -> Self {
        Self::with_builtin()
    }
}
