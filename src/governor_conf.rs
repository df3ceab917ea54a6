use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;

pub type ClientRateLimiter = DefaultKeyedRateLimiter<String>;

/// One request per second sustained per client, with up to `burst` allowed
/// back to back.
pub fn get_governor_conf(burst: u32) -> Arc<ClientRateLimiter> {
    let burst = NonZeroU32::new(burst).unwrap_or(NonZeroU32::MIN);
    let quota = Quota::per_second(NonZeroU32::MIN).allow_burst(burst);
    Arc::new(RateLimiter::keyed(quota))
}
