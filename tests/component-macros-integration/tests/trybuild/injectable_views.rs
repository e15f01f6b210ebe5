use component_macros::Injectable;
use di_abstractions::Injectable;
use std::sync::Arc;

trait Clock: Send + Sync {}

#[derive(Injectable)]
#[injectable(expose = "dyn Clock")]
struct SystemClock;

impl Clock for SystemClock {}

#[derive(Injectable)]
struct Scheduler {
    #[inject(ty = "SystemClock")]
    clock: Arc<dyn Clock>,
    #[inject(collection)]
    jobs: Vec<String>,
}

fn main() {
    let clock = SystemClock::factory();
    let instance = clock.freeze(Box::new(SystemClock));
    assert!(instance.cast::<dyn Clock>().is_some());

    let scheduler = Scheduler::factory();
    assert_eq!(scheduler.constructor().object_dependencies(), vec!["SystemClock".to_string()]);
}
