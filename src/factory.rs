//! End-to-end pipeline for one definition file
//!
//! definition → schemas → graph → roots → scope of work → primary key
//! check → values → generators (sequential, in declaration order).

use indexmap::IndexMap;
use minijinja::value::Value;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::info;

use crate::config::{FactoryConfig, Settings};
use crate::convert::ConverterSet;
use crate::error::Result;
use crate::generator::{Generator, GeneratorReport, Registry, RunContext};
use crate::graph::SchemaGraph;
use crate::postcall::{CommandRunner, ProcessRunner};
use crate::schema::{load_schemas, SchemaSet};
use crate::sink::{FsSink, OutputSink};
use crate::template::{Context, TemplateEngine};

/// Context key holding the definition directory
pub const BASE_PATH_KEY: &str = "basePath";

/// What one definition run produced
#[derive(Debug, Clone, Default)]
pub struct FactoryReport {
    pub definition: PathBuf,
    pub base_path: PathBuf,
    pub bundle_hash: String,
    pub roots: Vec<String>,
    /// Schema fullnames in processing order
    pub scope: Vec<String>,
    pub generators: Vec<GeneratorReport>,
}

impl FactoryReport {
    /// Every written file, generator by generator
    pub fn files(&self) -> impl Iterator<Item = &PathBuf> {
        self.generators.iter().flat_map(|g| g.files.iter())
    }

    pub fn generator(&self, name: &str) -> Option<&GeneratorReport> {
        self.generators.iter().find(|g| g.name == name)
    }
}

/// Schemas and graph of one definition
pub struct LoadedSchemas {
    pub schemas: SchemaSet,
    pub graph: SchemaGraph,
}

/// Load the schemas a definition names and build their graph
pub fn load_definition_schemas(config: &FactoryConfig, base_path: &Path) -> Result<LoadedSchemas> {
    let paths = config.schema_paths(base_path);
    info!(
        "Loading schemas {}: {}",
        paths.len(),
        paths.iter().map(|p| p.display().to_string()).collect::<Vec<_>>().join(", ")
    );
    let schemas = load_schemas(&paths)?;
    let graph = SchemaGraph::build(&schemas)?;
    Ok(LoadedSchemas { schemas, graph })
}

/// Evaluate `values` in declaration order; each sees `basePath` and the values before it
pub fn evaluate_values(
    values: &IndexMap<String, String>,
    base_path: &Path,
    converters: &ConverterSet,
) -> Result<Context> {
    let engine = TemplateEngine::new(converters, Registry::new());
    let mut context = Context::new();
    context.insert(
        BASE_PATH_KEY.to_string(),
        Value::from(base_path.display().to_string()),
    );
    for (key, template) in values {
        let value = engine.render_str(template, &context)?;
        context.insert(key.clone(), Value::from(value));
    }
    Ok(context)
}

/// Runs definition files against a sink and a process runner
pub struct Factory {
    settings: Settings,
    converters: ConverterSet,
    sink: Box<dyn OutputSink>,
    runner: Box<dyn CommandRunner>,
}

impl Factory {
    /// Filesystem output, real subprocesses, built-in converters
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            converters: ConverterSet::builtin(),
            sink: Box::new(FsSink),
            runner: Box::new(ProcessRunner),
        }
    }

    pub fn with_sink(mut self, sink: impl OutputSink + 'static) -> Self {
        self.sink = Box::new(sink);
        self
    }

    pub fn with_runner(mut self, runner: impl CommandRunner + 'static) -> Self {
        self.runner = Box::new(runner);
        self
    }

    pub fn with_converters(mut self, converters: ConverterSet) -> Self {
        self.converters = converters;
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Run every definition in turn; the first failure stops the batch
    pub fn run_all(&self, definitions: &[PathBuf]) -> Result<Vec<FactoryReport>> {
        info!("Provided configurations {}", definitions.len());
        let started = Instant::now();
        let reports = definitions
            .iter()
            .map(|definition| self.run(definition))
            .collect::<Result<Vec<_>>>()?;
        info!("Generation successful in {:.3}s", started.elapsed().as_secs_f64());
        Ok(reports)
    }

    /// Run one definition file
    pub fn run(&self, definition: &Path) -> Result<FactoryReport> {
        info!("Loading configuration from {}", definition.display());
        let config = FactoryConfig::load(definition)?;
        let base_path = FactoryConfig::base_path(definition)?;
        info!("Base path is set to {}", base_path.display());

        let LoadedSchemas { schemas, graph } = load_definition_schemas(&config, &base_path)?;
        let roots: Vec<String> = graph
            .roots()
            .iter()
            .map(|&idx| graph.node(idx).fullname().to_string())
            .collect();

        let scope = graph.scope_of_work();
        let scope_names: Vec<String> = scope
            .iter()
            .map(|&idx| graph.node(idx).fullname().to_string())
            .collect();
        info!("Scope of work sequence {}: {}", scope.len(), scope_names.join(", "));

        graph.validate_primary_keys()?;

        info!("Evaluate values");
        let values = evaluate_values(&config.values, &base_path, &self.converters)?;

        let generators = config
            .generators
            .iter()
            .cloned()
            .map(|g| Generator::load(g, &base_path, &self.settings.template_extension))
            .collect::<Result<Vec<_>>>()?;

        let ctx = RunContext {
            schemas: &schemas,
            graph: &graph,
            scope: &scope,
            values: &values,
            base_path: &base_path,
            converters: &self.converters,
            sink: self.sink.as_ref(),
            runner: self.runner.as_ref(),
            skip_post_calls: self.settings.skip_post_calls,
        };

        let mut registry = Registry::new();
        let mut reports = Vec::with_capacity(generators.len());
        for generator in &generators {
            let report = generator.run(&ctx, &mut registry)?;
            info!(
                "Generator `{}` wrote {} files, skipped {}",
                report.name,
                report.files.len(),
                report.skipped.len()
            );
            reports.push(report);
        }

        Ok(FactoryReport {
            definition: definition.to_path_buf(),
            base_path,
            bundle_hash: schemas.bundle_hash().to_string(),
            roots,
            scope: scope_names,
            generators: reports,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorCategory, GenError};
    use crate::sink::MemorySink;
    use std::fs;
    use tempfile::TempDir;

    const SCHEMA: &str = r#"{"type": "record", "name": "shop.Order", "fields": [
        {"name": "id", "type": "int", "primary": true},
        {"name": "items", "type": {"type": "array", "items": {"type": "record", "name": "Item", "fields": [
            {"name": "qty", "type": "int"}
        ]}}}
    ]}"#;

    fn write_definition(dir: &Path, definition: &str) -> PathBuf {
        fs::create_dir_all(dir.join("schemas")).unwrap();
        fs::write(dir.join("schemas/order.avsc"), SCHEMA).unwrap();
        fs::create_dir_all(dir.join("tpl")).unwrap();
        fs::write(dir.join("tpl/record.jinja"), "{{ name }} in {{ out }}").unwrap();
        let path = dir.join("factory.yaml");
        fs::write(&path, definition).unwrap();
        path
    }

    #[test]
    fn test_evaluate_values_in_order() {
        let mut values = IndexMap::new();
        values.insert("out".to_string(), "{{ basePath }}/out".to_string());
        values.insert("java".to_string(), "{{ out }}/java".to_string());
        let context = evaluate_values(&values, Path::new("/p"), &ConverterSet::builtin()).unwrap();
        assert_eq!(context["java"].as_str(), Some("/p/out/java"));
        assert_eq!(context[BASE_PATH_KEY].as_str(), Some("/p"));
    }

    #[test]
    fn test_missing_primary_key_aborts_before_generators() {
        let dir = TempDir::new().unwrap();
        let definition = write_definition(
            dir.path(),
            "schemas: [schemas]\ngenerators:\n  - path: tpl\n",
        );
        let sink = MemorySink::new();
        let factory = Factory::new(Settings::default()).with_sink(sink.clone());
        let err = factory.run(&definition).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::GraphInvariant);
        assert!(err.to_string().contains("shop.Item"));
        assert!(sink.is_empty());
    }

    #[test]
    fn test_unknown_template_set() {
        let dir = TempDir::new().unwrap();
        let definition = write_definition(
            dir.path(),
            "schemas: [schemas]\ngenerators:\n  - path: missing\n",
        );
        fs::write(
            dir.path().join("schemas/order.avsc"),
            r#"{"type": "record", "name": "shop.Order", "fields": [{"name": "id", "type": "int"}]}"#,
        )
        .unwrap();
        let err = Factory::new(Settings::default()).run(&definition).unwrap_err();
        assert!(matches!(err, GenError::Config(_)));
    }

    #[test]
    fn test_run_reports_scope_and_files() {
        let dir = TempDir::new().unwrap();
        let definition = write_definition(
            dir.path(),
            "schemas: [schemas]\nvalues:\n  out: generated\ngenerators:\n  - path: tpl\n",
        );
        fs::write(
            dir.path().join("schemas/order.avsc"),
            SCHEMA.replace(r#"{"name": "qty", "type": "int"}"#, r#"{"name": "qty", "type": "int", "primary": true}"#),
        )
        .unwrap();

        let sink = MemorySink::new();
        let report = Factory::new(Settings::default())
            .with_sink(sink.clone())
            .run(&definition)
            .unwrap();

        assert_eq!(report.roots, vec!["shop.Order"]);
        assert_eq!(report.scope, vec!["shop.Item", "shop.Order"]);
        assert_eq!(report.files().count(), 2);
        assert_eq!(report.bundle_hash.len(), 64);
        assert_eq!(
            sink.get(&dir.path().join("shop/Item")).as_deref(),
            Some("Item in generated")
        );
    }
}
