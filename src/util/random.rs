use std::ops::RangeInclusive;
#[cfg(test)] use std::sync::Mutex;

use rand::{Rng, RngCore};


#[cfg(test)]
/// automock expectations for static methods are global - hold this lock to avoid races
pub static MOCK_RANDOM_MUTEX: Mutex<()> = Mutex::new(());

#[cfg_attr(test, mockall::automock)]
pub trait Random {
    fn next_u64() -> u64;
    fn gen_usize_range(range: RangeInclusive<usize>) -> usize;
    fn fill_bytes(buf: &mut [u8]);
}

pub struct RngRandom {}
impl Random for RngRandom {
    fn next_u64() -> u64 {
        rand::thread_rng().next_u64()
    }

    fn gen_usize_range(range: RangeInclusive<usize>) -> usize {
        rand::thread_rng().gen_range(range)
    }

    fn fill_bytes(buf: &mut [u8]) {
        rand::thread_rng().fill_bytes(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gen_usize_range_is_inclusive() {
        for _ in 0..100 {
            let n = RngRandom::gen_usize_range(1000..=1000);
            assert_eq!(n, 1000);
        }
        for _ in 0..1000 {
            let n = RngRandom::gen_usize_range(1..=2);
            assert!((1..=2).contains(&n));
        }
    }
}
