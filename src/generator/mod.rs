//! Generator orchestration
//!
//! One generator run over the shared scope of work:
//! 1. filter and classify every node (allow/deny lists, role templates)
//! 2. name it: naming templates, or the `overrides` generator's names for
//!    nodes this generator does not render
//! 3. build the [`EntityStore`] in scope order
//! 4. render each eligible entity with its role template into the sink
//! 5. publish the store to the [`Registry`]
//! 6. run the optional post-call with the written files

pub mod registry;
pub mod role;

pub use registry::Registry;
pub use role::{Role, RoleFacts};

use minijinja::value::Value;
use petgraph::graph::NodeIndex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::GeneratorConfig;
use crate::convert::ConverterSet;
use crate::entity::{Entity, EntityId, EntityStore, Naming};
use crate::error::{GenError, Result};
use crate::graph::SchemaGraph;
use crate::postcall::{resolve_command, CommandRunner};
use crate::schema::{NamedKind, NamedSchema, SchemaSet};
use crate::sink::OutputSink;
use crate::template::{Context, EntityView, SchemaView, TemplateEngine, TemplateSet};

const NAMESPACE_TEMPLATE: &str = "@naming/namespace";
const NAME_TEMPLATE: &str = "@naming/name";
const FULLNAME_TEMPLATE: &str = "@naming/fullname";
const FOLDER_TEMPLATE: &str = "@naming/folder";
const FILENAME_TEMPLATE: &str = "@naming/filename";
const POST_CALL_TEMPLATE: &str = "@post-call";

/// Everything a generator run reads or writes besides its own configuration
pub struct RunContext<'a> {
    pub schemas: &'a SchemaSet,
    pub graph: &'a SchemaGraph,
    /// Flattened scope of work
    pub scope: &'a [NodeIndex],
    /// Evaluated values, `basePath` included
    pub values: &'a Context,
    pub base_path: &'a Path,
    pub converters: &'a ConverterSet,
    pub sink: &'a dyn OutputSink,
    pub runner: &'a dyn CommandRunner,
    pub skip_post_calls: bool,
}

/// What one generator did
#[derive(Debug, Clone, Default)]
pub struct GeneratorReport {
    pub name: String,
    pub entities: usize,
    pub files: Vec<PathBuf>,
    /// Schema fullnames not rendered, with the reason
    pub skipped: Vec<(String, String)>,
    /// Post-call command, once rendered
    pub post_call: Option<String>,
}

/// A configured generator with its template set
#[derive(Debug, Clone)]
pub struct Generator {
    config: GeneratorConfig,
    templates: TemplateSet,
}

struct Planned {
    node: NodeIndex,
    role: Option<Role>,
}

impl Generator {
    pub fn new(config: GeneratorConfig, templates: TemplateSet) -> Self {
        Self { config, templates }
    }

    /// Load the template set named by `config.path`
    pub fn load(config: GeneratorConfig, base_path: &Path, extension: &str) -> Result<Self> {
        let templates = TemplateSet::load(&config.path, base_path, extension)?;
        info!(
            "Create generator `{}`, with templates: {}",
            config.name(),
            templates.names().collect::<Vec<_>>().join(", ")
        );
        Ok(Self::new(config, templates))
    }

    pub fn name(&self) -> &str {
        self.config.name()
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Role templates this generator has
    pub fn roles(&self) -> Vec<Role> {
        Role::ALL
            .into_iter()
            .filter(|role| self.templates.contains(role.as_str()))
            .collect()
    }

    /// Run over the scope of work and publish the result to `registry`
    pub fn run(&self, ctx: &RunContext<'_>, registry: &mut Registry) -> Result<GeneratorReport> {
        let name = self.name().to_string();
        info!("Start generator `{}`", name);

        if let Some(target) = &self.config.overrides {
            registry.store(target)?;
        }

        let engine = self.engine(ctx.converters, registry.clone())?;
        let roles = self.roles();
        let mut report = GeneratorReport {
            name: name.clone(),
            ..GeneratorReport::default()
        };

        let mut plan = Vec::new();
        let mut namings = Vec::new();
        for &idx in ctx.scope {
            let node = ctx.graph.node(idx);
            if node.kind() == NamedKind::Fixed {
                continue;
            }
            let fullname = node.fullname();

            let role = match self.eligibility(ctx.graph, idx, &roles) {
                Ok(role) => Some(role),
                Err(reason) => {
                    info!("Skip entity `{}` {}", fullname, reason);
                    report.skipped.push((fullname.to_string(), reason.to_string()));
                    None
                }
            };

            let naming = self.naming(&engine, ctx, &node.schema, role.is_some(), registry)?;
            debug!(
                "Create entity `{}` at `{}` with `{}`",
                naming.name, naming.namespace, naming.fullname
            );
            namings.push((idx, naming));
            plan.push(Planned { node: idx, role });
        }

        let store = Arc::new(EntityStore::build(&name, ctx.graph, ctx.schemas, &namings)?);
        info!("{} entities created", store.len());
        report.entities = store.len();

        for planned in &plan {
            let Some(role) = planned.role else {
                continue;
            };
            let fullname = ctx.graph.node(planned.node).fullname();
            let id = store.by_schema(fullname).ok_or_else(|| {
                GenError::graph(fullname, format!("no entity built by generator `{}`", name))
            })?;
            let path = self.render_entity(&engine, ctx, &store, id, role)?;
            report.files.push(path);
        }

        registry.publish(name.clone(), Arc::clone(&store))?;

        if self.config.post_call.is_some() {
            report.post_call = Some(self.post_call(&engine, ctx, &report.files)?);
        }

        Ok(report)
    }

    fn engine(&self, converters: &ConverterSet, registry: Registry) -> Result<TemplateEngine> {
        let mut engine = TemplateEngine::new(converters, registry);
        engine.add_set(&self.templates)?;

        let naming = &self.config.templates;
        let inline = [
            (NAMESPACE_TEMPLATE, &naming.namespace),
            (NAME_TEMPLATE, &naming.name),
            (FULLNAME_TEMPLATE, &naming.fullname),
            (FOLDER_TEMPLATE, &naming.folder),
            (FILENAME_TEMPLATE, &naming.filename),
            (POST_CALL_TEMPLATE, &self.config.post_call),
        ];
        for (key, source) in inline {
            if let Some(source) = source {
                engine.add_template(key, source.clone())?;
            }
        }
        Ok(engine)
    }

    /// Role to render with, or the reason the node is skipped
    fn eligibility(&self, graph: &SchemaGraph, idx: NodeIndex, roles: &[Role]) -> std::result::Result<Role, &'static str> {
        let node = graph.node(idx);
        if let Some(filters) = &self.config.filters {
            if !filters.admits(node.fullname()) {
                return Err("by filter");
            }
        }
        let facts = RoleFacts {
            is_enum: node.kind() == NamedKind::Enum,
            is_root: node.is_root,
            is_owner: graph.is_owner(idx),
            is_dependent: graph.is_dependent(idx),
        };
        Role::classify(&facts, |role| roles.contains(&role)).ok_or("no proper template")
    }

    fn naming(
        &self,
        engine: &TemplateEngine,
        ctx: &RunContext<'_>,
        schema: &Arc<NamedSchema>,
        eligible: bool,
        registry: &Registry,
    ) -> Result<Naming> {
        let templates = &self.config.templates;
        let schema_view = SchemaView::value(Arc::clone(schema));
        let base = extend(ctx.values, [("schema", schema_view.clone())]);

        let (namespace, name) = match &self.config.overrides {
            Some(target) if !eligible => {
                info!("Take entity `{}` from `{}`", schema.fullname, target);
                let (store, id) = registry.lookup(target, &schema.fullname)?;
                let entity = store.get(id);
                (entity.namespace().to_string(), entity.name().to_string())
            }
            _ => {
                let namespace = match templates.namespace {
                    Some(_) => render_inline(engine, NAMESPACE_TEMPLATE, &base)?,
                    None => schema.namespace_or_empty().to_string(),
                };
                let name = match templates.name {
                    Some(_) => render_inline(engine, NAME_TEMPLATE, &base)?,
                    None => schema.name.clone(),
                };
                (namespace, name)
            }
        };

        let fullname = match templates.fullname {
            Some(_) => {
                let context = extend(
                    &base,
                    [
                        ("namespace", Value::from(namespace.as_str())),
                        ("name", Value::from(name.as_str())),
                    ],
                );
                render_inline(engine, FULLNAME_TEMPLATE, &context)?
            }
            None if namespace.is_empty() => name.clone(),
            None => format!("{}.{}", namespace, name),
        };

        Ok(Naming::new(namespace, name, fullname))
    }

    fn render_entity(
        &self,
        engine: &TemplateEngine,
        ctx: &RunContext<'_>,
        store: &Arc<EntityStore>,
        id: EntityId,
        role: Role,
    ) -> Result<PathBuf> {
        let entity = store.get(id);
        let naming = entity.naming();
        let view = EntityView::value(store, id);

        let naming_context = extend(
            ctx.values,
            [
                ("schema", SchemaView::value(Arc::clone(entity.schema()))),
                ("namespace", Value::from(naming.namespace.as_str())),
                ("name", Value::from(naming.name.as_str())),
                ("fullname", Value::from(naming.fullname.as_str())),
                ("entity", view.clone()),
            ],
        );
        let folder = match self.config.templates.folder {
            Some(_) => render_inline(engine, FOLDER_TEMPLATE, &naming_context)?,
            None => naming.namespace.clone(),
        };
        let filename = match self.config.templates.filename {
            Some(_) => render_inline(engine, FILENAME_TEMPLATE, &naming_context)?,
            None => naming.name.clone(),
        };
        let path = ctx.base_path.join(folder).join(filename);

        let mut context = extend(
            ctx.values,
            [
                ("namespace", Value::from(naming.namespace.as_str())),
                ("name", Value::from(naming.name.as_str())),
                ("fullname", Value::from(naming.fullname.as_str())),
                ("entity", view),
                ("generator", Value::from(self.name())),
            ],
        );
        if let Entity::Enum(enumeration) = entity {
            context.insert("symbols".to_string(), Value::from(enumeration.symbols().to_vec()));
        }

        info!("Generate {} {} into {}", role, naming.fullname, path.display());
        let content = engine.render(role.as_str(), &context)?;
        if let Some(parent) = path.parent() {
            ctx.sink.ensure_dir(parent)?;
        }
        ctx.sink.write_file(&path, &content)?;
        Ok(path)
    }

    fn post_call(&self, engine: &TemplateEngine, ctx: &RunContext<'_>, files: &[PathBuf]) -> Result<String> {
        let files: Vec<String> = files.iter().map(|f| f.display().to_string()).collect();
        let context = extend(
            ctx.values,
            [
                ("files", Value::from(files)),
                ("generator", Value::from(self.name())),
            ],
        );
        let command = resolve_command(&render_inline(engine, POST_CALL_TEMPLATE, &context)?, ctx.base_path);

        if ctx.skip_post_calls {
            info!("Skip postCall: {}", command);
            return Ok(command);
        }

        info!("Run postCall: {}", command);
        let output = ctx.runner.run(&command, ctx.base_path)?;
        info!("Output: {}", output.stdout.trim_end());
        if !output.success() {
            return Err(GenError::PostCall {
                command,
                message: match output.status {
                    Some(code) => format!("exit status {}: {}", code, output.stderr.trim_end()),
                    None => "terminated by signal".to_string(),
                },
            });
        }
        Ok(command)
    }
}

fn render_inline(engine: &TemplateEngine, key: &str, context: &Context) -> Result<String> {
    Ok(engine.render(key, context)?.trim().to_string())
}

/// `values` plus `extra`, `extra` winning
pub fn extend<'k>(values: &Context, extra: impl IntoIterator<Item = (&'k str, Value)>) -> Context {
    let mut context = values.clone();
    for (key, value) in extra {
        context.insert(key.to_string(), value);
    }
    context
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FiltersConfig, NamingTemplates};
    use crate::entity::tests::ORDER;
    use crate::postcall::CommandOutput;
    use crate::sink::MemorySink;
    use std::cell::RefCell;

    #[derive(Default)]
    struct Recording {
        commands: RefCell<Vec<String>>,
    }

    impl CommandRunner for Recording {
        fn run(&self, command: &str, _working_dir: &Path) -> Result<CommandOutput> {
            self.commands.borrow_mut().push(command.to_string());
            Ok(CommandOutput {
                stdout: "ok".to_string(),
                status: Some(0),
                ..CommandOutput::default()
            })
        }
    }

    struct Fixture {
        schemas: SchemaSet,
        graph: SchemaGraph,
        scope: Vec<NodeIndex>,
        values: Context,
        converters: ConverterSet,
        sink: MemorySink,
        runner: Recording,
    }

    impl Fixture {
        fn new() -> Self {
            let schemas = SchemaSet::from_sources([("order.avsc", ORDER)]).unwrap();
            let graph = SchemaGraph::build(&schemas).unwrap();
            let scope = graph.scope_of_work();
            let mut values = Context::new();
            values.insert("basePath".to_string(), Value::from("/base"));
            Self {
                schemas,
                graph,
                scope,
                values,
                converters: ConverterSet::builtin(),
                sink: MemorySink::new(),
                runner: Recording::default(),
            }
        }

        fn ctx(&self) -> RunContext<'_> {
            RunContext {
                schemas: &self.schemas,
                graph: &self.graph,
                scope: &self.scope,
                values: &self.values,
                base_path: Path::new("/base"),
                converters: &self.converters,
                sink: &self.sink,
                runner: &self.runner,
                skip_post_calls: false,
            }
        }
    }

    fn generator(name: &str, templates: &[(&str, &str)], configure: impl FnOnce(&mut GeneratorConfig)) -> Generator {
        let mut config = GeneratorConfig {
            path: name.to_string(),
            ..GeneratorConfig::default()
        };
        configure(&mut config);
        Generator::new(
            config,
            TemplateSet::from_sources("inline", templates.iter().copied()),
        )
    }

    #[test]
    fn test_renders_by_role() {
        let fixture = Fixture::new();
        let mut registry = Registry::new();
        let generator = generator(
            "java",
            &[
                ("root", "root {{ name }}"),
                ("dependent", "dependent {{ name }} of {{ entity.owners|join(',') }}"),
                ("enum", "{{ symbols|join('|') }}"),
            ],
            |_| {},
        );

        let report = generator.run(&fixture.ctx(), &mut registry).unwrap();
        assert_eq!(report.entities, 6);
        assert_eq!(report.files.len(), 4);

        let files = fixture.sink.files();
        assert_eq!(files[Path::new("/base/shop/Order")], "root Order");
        assert_eq!(files[Path::new("/base/shop/OrderItem")], "dependent OrderItem of shop.Order");
        assert_eq!(files[Path::new("/base/shop/Part")], "dependent Part of shop.OrderItem");
        assert_eq!(files[Path::new("/base/shop/Status")], "NEW|DONE");

        let skipped: Vec<&str> = report.skipped.iter().map(|(f, _)| f.as_str()).collect();
        assert_eq!(skipped, vec!["shop.Address", "shop.Customer"]);
        assert!(registry.contains("java"));
    }

    #[test]
    fn test_naming_templates_and_filters() {
        let fixture = Fixture::new();
        let mut registry = Registry::new();
        let generator = generator("java", &[("record", "{{ fullname }}")], |config| {
            config.templates = NamingTemplates {
                namespace: Some("com.acme.{{ schema.namespace }}".to_string()),
                name: Some("{{ schema.name }}Dto".to_string()),
                folder: Some("out/{{ namespace|replace('.', '/') }}".to_string()),
                filename: Some("{{ name }}.java".to_string()),
                ..NamingTemplates::default()
            };
            config.filters = Some(FiltersConfig {
                allow: Some(vec!["shop.Order".to_string(), "shop.Customer".to_string()]),
                deny: Some(vec!["shop.Customer".to_string()]),
            });
        });

        let report = generator.run(&fixture.ctx(), &mut registry).unwrap();
        assert_eq!(report.files, vec![PathBuf::from("/base/out/com/acme/shop/OrderDto.java")]);
        assert_eq!(
            fixture.sink.get(Path::new("/base/out/com/acme/shop/OrderDto.java")).as_deref(),
            Some("com.acme.shop.OrderDto")
        );
        let (store, id) = registry.lookup("java", "shop.Customer").unwrap();
        assert_eq!(store.get(id).name(), "CustomerDto");
    }

    #[test]
    fn test_overrides_take_names_from_base() {
        let fixture = Fixture::new();
        let mut registry = Registry::new();
        let base = generator("base", &[("record", "")], |config| {
            config.templates.name = Some("{{ schema.name }}Base".to_string());
        });
        base.run(&fixture.ctx(), &mut registry).unwrap();

        let detail = generator("detail", &[("root", "{{ name }} uses {{ entity.fields[2].type.entity.name }}")], |config| {
            config.overrides = Some("base".to_string());
        });
        detail.run(&fixture.ctx(), &mut registry).unwrap();

        let (store, id) = registry.lookup("detail", "shop.Customer").unwrap();
        assert_eq!(store.get(id).name(), "CustomerBase");
        let (store, id) = registry.lookup("detail", "shop.Order").unwrap();
        assert_eq!(store.get(id).name(), "Order");
        assert_eq!(
            fixture.sink.get(Path::new("/base/shop/Order")).as_deref(),
            Some("Order uses CustomerBase")
        );
    }

    #[test]
    fn test_unknown_override_target() {
        let fixture = Fixture::new();
        let mut registry = Registry::new();
        let detail = generator("detail", &[("root", "")], |config| {
            config.overrides = Some("base".to_string());
        });
        let err = detail.run(&fixture.ctx(), &mut registry).unwrap_err();
        assert!(matches!(err, GenError::UnknownGenerator { .. }));
    }

    #[test]
    fn test_post_call_gets_files() {
        let fixture = Fixture::new();
        let mut registry = Registry::new();
        let generator = generator("java", &[("root", "x")], |config| {
            config.post_call = Some("fmt {{ files|join(' ') }}".to_string());
        });
        let report = generator.run(&fixture.ctx(), &mut registry).unwrap();
        assert_eq!(report.post_call.as_deref(), Some("fmt /base/shop/Order"));
        assert_eq!(*fixture.runner.commands.borrow(), vec!["fmt /base/shop/Order".to_string()]);
    }

    #[test]
    fn test_missing_context_variable_fails() {
        let fixture = Fixture::new();
        let mut registry = Registry::new();
        let generator = generator("java", &[("root", "{{ nope }}")], |_| {});
        let err = generator.run(&fixture.ctx(), &mut registry).unwrap_err();
        assert!(matches!(err, GenError::Template(_)));
        assert!(!registry.contains("java"));
    }
}
