/// A counter that only holds even values
#[derive(Debug, Clone)]
pub struct CounterSubclass {
    value: i64,
    double: i64,
    pub step: i64,
    advanced_cache: ::std::cell::RefCell<::std::collections::HashMap<u32, i64>>,
}
impl CounterSubclass {
    pub fn new(
        value: i64,
        step: Option<i64>
    ) -> Result<Self, ::declgen::runtime::ContractViolation> {
        let step: i64 = step.unwrap_or_else(|| 2);
        if !(value % 2 == 0) {
            return Err(
                ::declgen::runtime::ContractViolation::new(
                    "value",
                    format!("The value has to be even but was {:?}.", value)
                )
            );
        }
        if !(step > 0) {
            return Err(
                ::declgen::runtime::ContractViolation::new(
                    "step",
                    format!("The step has to be positive but was {:?}.", step)
                )
            );
        }
        let double: i64 = value * 2;
        Ok(Self {
            value,
            double,
            step,
            advanced_cache: ::std::default::Default::default()
        })
    }
}
impl Counter for CounterSubclass {
    fn get_value(&self) -> i64 {
        self.value
    }
    fn get_double(&self) -> i64 {
        self.double
    }
    fn advanced(&self, times: u32) -> i64 {
        assert!(times > 0, "The times has to be positive but was {:?}.", times);
        let cache_key = times;
        let cached_value = self.advanced_cache.borrow().get(&cache_key).cloned();
        let result: i64 = match cached_value {
            Some(value) => value,
            None => {
                EVALUATIONS.with(|n| n.set(n.get() + 1));
                self.value + self.step * i64::from(times)
            },
        };
        self.advanced_cache.borrow_mut().entry(cache_key).or_insert_with(|| result.clone());
        result
    }
    fn describe(&self) -> String {
        ::declgen::runtime::tracing::debug!(
            declaration = "Counter", method = "describe", "enter"
        );
        let result: String = { format!("counter at {}", self.value) };
        ::declgen::runtime::tracing::debug!(
            declaration = "Counter", method = "describe", "exit"
        );
        result
    }
}
impl PartialEq for CounterSubclass {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value && self.double == other.double
            && self.step == other.step
    }
}
