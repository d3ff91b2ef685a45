use std::sync::Once;

static TEST_LOGGING_INIT: Once = Once::new();

pub fn init_test_logging() {
    TEST_LOGGING_INIT.call_once(|| {
        env_logger::builder().is_test(true).init();
    })
}

pub struct SetupEmpty;

impl SetupEmpty {
    pub fn init() -> SetupEmpty {
        init_test_logging();
        SetupEmpty {}
    }
}
