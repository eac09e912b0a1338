#![no_main]

//! Fuzz target for random definition graphs
//!
//! Builds up to eight components wired to each other through constructor
//! arguments and properties in arbitrary scopes, then resolves every key.
//! Resolution must terminate, fail only with the documented errors and keep
//! singleton identity.

use arbitrary::Arbitrary;
use component_factory::{ComponentFactory, Definition, DiError, Injection, Scope};
use libfuzzer_sys::fuzz_target;
use std::sync::{Arc, Mutex, Weak};

const MAX_NODES: usize = 8;

#[derive(Default)]
struct Node {
    args: Vec<Weak<Node>>,
    props: Mutex<Vec<Weak<Node>>>,
}

#[derive(Debug, Arbitrary)]
enum FuzzScope {
    Singleton,
    Prototype,
    ObjectGraph,
}

#[derive(Debug, Arbitrary)]
struct NodePlan {
    scope: FuzzScope,
    abstract_node: bool,
    args: Vec<u8>,
    props: Vec<u8>,
    fail_construct: bool,
}

fn key(index: u8) -> String {
    format!("node{}", index as usize % (MAX_NODES + 1))
}

fuzz_target!(|plans: Vec<NodePlan>| {
    let factory = ComponentFactory::new();

    for (i, plan) in plans.iter().take(MAX_NODES).enumerate() {
        let k = format!("node{i}");
        if plan.abstract_node {
            factory.register(Definition::abstract_placeholder::<Node>(k)).unwrap();
            continue;
        }

        let mut builder = Definition::builder::<Node>(k.as_str()).scope(match plan.scope {
            FuzzScope::Singleton => Scope::Singleton,
            FuzzScope::Prototype => Scope::Prototype,
            FuzzScope::ObjectGraph => Scope::ObjectGraph,
        });
        for arg in plan.args.iter().take(3) {
            builder = builder.arg_ref(key(*arg));
        }
        let fail = plan.fail_construct;
        builder = builder.construct(move |args| {
            if fail {
                return Err(DiError::creation_failed("fuzz", "requested failure"));
            }
            let args = (0..args.len())
                .map(|i| args.component::<Node>(i).map(|n| Arc::downgrade(&n)))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Node { args, props: Mutex::new(Vec::new()) })
        });
        for (n, prop) in plan.props.iter().take(3).enumerate() {
            builder = builder.property::<Node, _>(
                format!("p{n}"),
                Injection::reference(key(*prop)),
                |node, other| node.props.lock().unwrap().push(Arc::downgrade(&other)),
            );
        }
        factory.register(builder.build()).unwrap();
    }

    for key in factory.definition_keys() {
        match factory.get::<Node>(&key) {
            Ok(first) => {
                let definition = factory.definition(&key).unwrap();
                if definition.scope() == Scope::Singleton {
                    let second = factory.get::<Node>(&key).unwrap();
                    assert!(Arc::ptr_eq(&first, &second));
                }
            }
            Err(
                DiError::UnknownComponent { .. }
                | DiError::AbstractComponent { .. }
                | DiError::UnresolvableCycle { .. }
                | DiError::CreationFailed { .. },
            ) => {}
            Err(other) => panic!("unexpected error for {key}: {other:?}"),
        }
    }
});
