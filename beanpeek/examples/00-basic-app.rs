use beanpeek::application::Application;
use beanpeek::config::ApplicationConfig;
use beanpeek_di::instance_provider::ComponentInstancePtr;
use beanpeek_di::{component_impl, Component};

// a component with a value injected from the properties file; registration of this component
// fails if the property is missing
#[derive(Component)]
struct Printer {
    #[component(config = "printer.prefix")]
    prefix: String,
}

#[component_impl]
impl Printer {
    fn print(&self, text: &str) {
        println!("{} {}", self.prefix, text);
    }

    // called when the application shuts down
    #[pre_destroy]
    fn flush(&self) {
        println!("{} bye!", self.prefix);
    }
}

#[derive(Component)]
struct HelloWorld {
    printer: ComponentInstancePtr<Printer>,
}

#[component_impl]
impl HelloWorld {
    // called right after the component is registered
    #[post_construct]
    fn greet(&self) {
        self.printer.print("Hello world!");
    }
}

// note: for the sake of simplicity, errors are unwrapped, rather than gracefully handled
fn main() {
    // normally, config comes from beanpeek.json or BEANPEEK_ environment variables - see
    // application::create_default()
    let config = ApplicationConfig::default()
        .with_properties_file(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/examples/application.properties"
        ))
        .with_scan_namespaces([module_path!()]);

    let mut application = Application::create(&config).expect("unable to create application");

    // prints "[example] Hello world!"
    application.run().expect("error registering components");

    // prints "[example] bye!"
    application.shutdown();
}
