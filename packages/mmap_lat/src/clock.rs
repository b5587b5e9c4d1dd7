//! Reading the processor cycle counter.

/// Returns the current value of the processor cycle counter.
///
/// The value is an opaque cycle count with no calibration to wall-clock units.
/// Two readings taken on the same processor can be subtracted to obtain the
/// cycles elapsed between them; readings taken on different processors may be
/// skewed against each other by a small constant.
///
/// The read costs a handful of cycles and has no side effects, which makes it
/// suitable for timing individual system calls.
///
/// # Examples
///
/// ```
/// use mmap_lat::cycles;
///
/// let start = cycles();
/// let work = std::hint::black_box(42 * 42);
/// let elapsed = cycles().wrapping_sub(start);
///
/// println!("computed {work} in {elapsed} cycles");
/// ```
#[cfg(target_arch = "x86_64")]
#[must_use]
#[inline]
#[cfg_attr(test, mutants::skip)] // Real timing logic in tests is not desirable.
pub fn cycles() -> u64 {
    // SAFETY: RDTSC has no preconditions and no effect beyond producing the counter value.
    unsafe { core::arch::x86_64::_rdtsc() }
}

/// Returns the current value of the processor cycle counter.
///
/// The value is an opaque cycle count with no calibration to wall-clock units.
/// Two readings taken on the same processor can be subtracted to obtain the
/// cycles elapsed between them; readings taken on different processors may be
/// skewed against each other by a small constant.
///
/// The read costs a handful of cycles and has no side effects, which makes it
/// suitable for timing individual system calls.
#[cfg(target_arch = "aarch64")]
#[must_use]
#[inline]
#[cfg_attr(test, mutants::skip)] // Real timing logic in tests is not desirable.
pub fn cycles() -> u64 {
    let count: u64;

    // SAFETY: CNTVCT_EL0 is readable from EL0 and the read has no effect beyond
    // producing the counter value.
    unsafe {
        core::arch::asm!("mrs {count}, cntvct_el0", count = out(reg) count, options(nomem, nostack));
    }

    count
}

#[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
compile_error!(
    "this crate requires a processor cycle counter (x86_64 RDTSC or aarch64 CNTVCT_EL0)"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counter_does_not_decrease_beyond_cross_processor_skew() {
        // The test thread may migrate between reads, and counters on
        // different processors are only synchronized to within a small
        // constant. Tolerate that much skew rather than demanding strict
        // monotonicity.
        const SKEW_TOLERANCE: u64 = 1_000_000;

        let mut previous = cycles();

        for _ in 0..1000 {
            let current = cycles();
            assert!(
                current.saturating_add(SKEW_TOLERANCE) >= previous,
                "cycle counter went backwards by more than plausible skew"
            );
            previous = current;
        }
    }

    #[test]
    fn counter_advances_across_real_work() {
        let start = cycles();

        // Enough work that even a coarse counter must tick at least once.
        std::thread::sleep(std::time::Duration::from_millis(1));

        assert!(cycles() > start);
    }
}
