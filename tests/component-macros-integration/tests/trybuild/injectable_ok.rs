use component_macros::Injectable;
use di_abstractions::Injectable;

#[derive(Injectable)]
#[injectable(name = "App\\Settings")]
struct Settings {
    #[inject(default = "production")]
    env: String,
    #[inject(default = 8)]
    workers: i64,
    #[inject(skip)]
    hits: u64,
}

fn main() {
    let factory = Settings::factory();
    assert_eq!(factory.type_name(), "App\\Settings");
    assert_eq!(factory.constructor().params.len(), 2);
}
