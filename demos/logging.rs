//! Demo of the factory's logging output
//!
//! Run with JSON logging (production):
//! ```bash
//! cargo run --example logging --features logging-json
//! ```
//!
//! Run with pretty logging (development):
//! ```bash
//! cargo run --example logging --features logging-pretty
//! ```

use component_factory::{
    ComponentFactory, Definition, Injection, PropertyPlaceholderConfigurer, ResolutionContext,
};
use std::sync::{Arc, Mutex, Weak};

#[allow(dead_code)]
struct Database {
    url: String,
}

#[allow(dead_code)]
struct UserService {
    db: Arc<Database>,
    audit: Mutex<Weak<AuditLog>>,
}

#[allow(dead_code)]
struct AuditLog {
    users: Mutex<Option<Arc<UserService>>>,
}

fn main() {
    component_factory::logging::builder()
        .trace()
        .factory_only()
        .init();

    println!("=== Component Factory Logging Demo ===\n");

    // Logs: "Creating new component factory"
    let factory = ComponentFactory::new();

    factory
        .add_post_processor(
            PropertyPlaceholderConfigurer::new()
                .with_properties_text("db.url = postgres://localhost/app\n"),
        )
        .expect("factory not finalized yet");

    // Logs: "Registering definition"
    factory
        .register_all([
            Definition::builder::<Database>("database")
                .arg_value::<String>("${db.url}")
                .construct(|args| Ok(Database { url: args.value(0)? }))
                .singleton()
                .build(),
            Definition::builder::<UserService>("users")
                .arg_ref("database")
                .construct(|args| {
                    Ok(UserService {
                        db: args.component(0)?,
                        audit: Mutex::new(Weak::new()),
                    })
                })
                .property::<AuditLog, _>("audit", Injection::reference("audit"), |users, audit| {
                    *users.audit.lock().unwrap() = Arc::downgrade(&audit)
                })
                .build(),
            Definition::builder::<AuditLog>("audit")
                .construct(|_| Ok(AuditLog { users: Mutex::new(None) }))
                .property_ref::<UserService, _>("users", "users", |audit, users| {
                    *audit.users.lock().unwrap() = Some(users)
                })
                .build(),
        ])
        .expect("unique keys");

    println!("--- Resolving object graph (constructs, then closes a property cycle) ---");
    let mut ctx = ResolutionContext::new();
    let users = factory
        .get_instance_in("users", &mut ctx)
        .expect("users resolves");
    println!("constructed {} components\n", ctx.constructed());

    println!("--- Resolving singleton again (trace: singleton store hit) ---");
    let _db = factory.get_instance("database").expect("database resolves");

    println!("\n--- Unresolved placeholder (warn) ---");
    let _ = PropertyPlaceholderConfigurer::new().substitute("${missing}");

    println!("\n--- Failed lookup (debug) ---");
    let _ = factory.get_instance("missing");

    drop(users);
    println!("\n=== Demo Complete ===");
}
