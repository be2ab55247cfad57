#![no_main]

use libfuzzer_sys::fuzz_target;
use perfgate::constraint::{PreviousResults, Timeframe};
use perfgate::filter::{normalize_endpoint, EndpointFilter, EndpointScope};
use perfgate::stats::PercentileList;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        // None of the configuration parsers may panic
        let _ = PercentileList::parse(input);
        let _ = PreviousResults::parse(input);
        let _ = EndpointScope::parse(Some(input));
        let _ = EndpointFilter::from_pattern(input);

        let normalized = normalize_endpoint(input);
        assert_eq!(normalize_endpoint(&normalized), normalized);

        if let Some((start, end)) = input.split_once('|') {
            let _ = Timeframe::parse(start, end);
        }
    }
});
