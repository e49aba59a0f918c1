use std::hint::black_box;
use std::sync::Arc;

use assetql::bytecode::{RawData, RawValue, ResourceRef};
use assetql::motor::{MockTransport, Motor, Platform};
use assetql::resources::{
    resource_factory, Args, Field, FieldContext, ResourceInfo, ResourceProvider,
};
use assetql::unstable::{Arg, Expr};
use assetql::{compile, execute, BuiltinRegistry, Config, Registry, Runtime, Type};

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

struct Packages(usize);

impl ResourceProvider for Packages {
    fn compute(&self, ctx: &FieldContext<'_>, _field: &str) -> anyhow::Result<RawData> {
        let mut items = Vec::with_capacity(self.0);
        for i in 0..self.0 {
            let mut args = Args::new();
            args.insert("name".to_string(), RawData::string(&format!("pkg{i}")));
            args.insert("installed".to_string(), RawData::bool(i % 2 == 0));
            let instance = ctx.runtime().create_resource("package", args)?;
            items.push(RawValue::Resource(ResourceRef::from_instance(instance)));
        }
        Ok(RawData::array(Type::resource("package"), items))
    }
}

fn registry(packages: usize) -> Registry {
    let mut registry = Registry::new();
    registry
        .add_resource_info(ResourceInfo::new("packages").with_list_type(Type::resource("package")))
        .unwrap();
    registry
        .add_resource_info(
            ResourceInfo::new("package")
                .with_field(Field::new("name", Type::String).mandatory())
                .with_field(Field::new("installed", Type::Bool)),
        )
        .unwrap();
    registry
        .add_factory(
            "packages",
            resource_factory(move |_, _| {
                Ok(Some(Arc::new(Packages(packages)) as Arc<dyn ResourceProvider>))
            }),
        )
        .unwrap();
    registry
}

fn query() -> Vec<Expr> {
    let installed = Expr::ident("installed").call("==", vec![Arg::positional(Expr::bool(true))]);
    vec![
        Expr::ident("packages")
            .call("where", vec![Arg::positional(Expr::Block(vec![installed]))])
            .field("length"),
        Expr::path("packages.length"),
    ]
}

fn compile_query(c: &mut Criterion) {
    let registry = registry(0);
    let builtins = BuiltinRegistry::standard();
    c.bench_function("compile where + length", |b| {
        b.iter(|| compile(black_box(&query()), &registry, &builtins).unwrap())
    });
}

fn execute_query(c: &mut Criterion) {
    let mut group = c.benchmark_group("execute where + length");
    for size in [16, 128, 1024].iter() {
        group.bench_with_input(BenchmarkId::new("packages", size), size, |b, &size| {
            let registry = Arc::new(registry(size));
            let code = compile(&query(), &registry, &BuiltinRegistry::standard()).unwrap();
            b.iter(|| {
                let motor = Motor::new(Arc::new(MockTransport::new()), Platform::default());
                let runtime = Runtime::new(registry.clone(), motor, Config::default());
                black_box(execute(&code, &runtime))
            })
        });
    }
    group.finish();
}

criterion_group!(benches, compile_query, execute_query);
criterion_main!(benches);
