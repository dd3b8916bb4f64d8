use beanpeek_di::container::ComponentContainerBuilder;
use beanpeek_di::instance_provider::ComponentInstancePtr;
use beanpeek_di::{component_alias, injectable, Component};

// this is a capability we would like to use in our component
#[injectable]
trait Greeter {
    fn greet(&self) -> String;
}

// a component without dependencies, which can be looked up by its concrete type or as
// dyn Greeter
#[derive(Component)]
struct HelloService;

#[component_alias]
impl Greeter for HelloService {
    fn greet(&self) -> String {
        "Hello world!".to_string()
    }
}

// another component, with a dependency injected by the generated constructor
#[derive(Component)]
struct GreetingService {
    greeter: ComponentInstancePtr<dyn Greeter + Send + Sync>,
}

impl GreetingService {
    fn welcome(&self) {
        println!("{}", self.greeter.greet());
    }
}

//noinspection DuplicatedCode
// note: for the sake of simplicity, errors are unwrapped, rather than gracefully handled
fn main() {
    let mut container = ComponentContainerBuilder::new()
        .expect("error initializing ComponentContainerBuilder")
        .build();

    // registration order doesn't matter - GreetingService gets constructed once its
    // dependency is available
    container
        .scan_and_register(module_path!())
        .expect("error registering components");

    let component = container
        .get::<GreetingService>()
        .expect("GreetingService should be registered");

    // prints "Hello world!"
    component.welcome();

    container.shutdown();
}
