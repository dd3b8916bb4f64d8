// note: this example assumes you've analyzed the previous one

use beanpeek_di::config::ConfigSource;
use beanpeek_di::container::ComponentContainerBuilder;
use beanpeek_di::instance_provider::ComponentInstancePtr;
use beanpeek_di::{component_alias, component_impl, injectable, Component};
use std::thread::sleep;
use std::time::Duration;

#[injectable]
trait MathService {
    fn slow_addition(&self, a: i32, b: i32) -> i32;

    fn negate(&self, value: i32) -> i32;
}

#[derive(Component)]
struct MathServiceImpl;

#[component_alias]
impl MathService for MathServiceImpl {
    // calls through dyn MathService get measured and logged
    #[log_execution_time]
    fn slow_addition(&self, a: i32, b: i32) -> i32 {
        sleep(Duration::from_millis(100));
        a + b
    }

    fn negate(&self, value: i32) -> i32 {
        -value
    }
}

#[derive(Component)]
#[component(tags = ["Demo"])]
struct Calculator {
    math: ComponentInstancePtr<dyn MathService + Send + Sync>,
    // values can be injected from a property source
    #[component(config = "calculator.offset")]
    offset: i32,
}

#[component_impl]
impl Calculator {
    #[post_construct]
    fn init(&self) {
        println!("Calculator ready with offset {}", self.offset);
    }

    #[pre_destroy]
    fn clean_up(&self) {
        println!("Calculator going away");
    }

    fn calculate(&self) -> i32 {
        self.math.negate(self.math.slow_addition(1, 2)) + self.offset
    }
}

fn main() {
    tracing_subscriber::fmt::init();

    let mut container = ComponentContainerBuilder::new()
        .expect("error initializing ComponentContainerBuilder")
        .with_config_source(ConfigSource::from_properties("calculator.offset = 10"))
        .build();

    container
        .scan_and_register(module_path!())
        .expect("error registering components");

    let calculator = container
        .get::<Calculator>()
        .expect("Calculator should be registered");

    // logs "MathServiceImpl.slow_addition took 100 ms" and prints "7"
    println!("{}", calculator.calculate());

    for component in container.component_names() {
        println!(
            "{}: {:?}",
            component,
            container.component_details(&component)
        );
    }

    container.shutdown();
}
