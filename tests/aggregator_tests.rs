use price_tick_logger::aggregator::{format_second, SecondAggregator, SecondPrices};
use price_tick_logger::model::tick::Tick;

#[test]
/// Verifies first/last folding inside one second:
/// however many ticks arrive, first stays the earliest price and last the latest.
fn many_ticks_in_one_second_keep_first_and_last() {
    let mut agg = SecondAggregator::new();
    let prices = [50_000.0, 50_003.5, 49_998.0, 50_001.0, 50_010.25];
    let mut key = String::new();
    for (i, price) in prices.iter().enumerate() {
        key = agg
            .update(&Tick::new(*price, 1_700_000_000_000 + i as u64 * 150))
            .expect("tick should aggregate");
    }

    assert_eq!(agg.len(), 1);
    assert_eq!(
        agg.get(&key),
        Some(SecondPrices {
            first_price: 50_000.0,
            last_price: 50_010.25,
        })
    );
}

#[test]
/// Verifies bucket keys:
/// ticks are keyed by their whole second formatted in local time.
fn update_returns_formatted_second_key() {
    let mut agg = SecondAggregator::new();
    let key = agg.update(&Tick::new(1.0, 100_700)).unwrap();
    assert_eq!(key, format_second(100).unwrap());
}

#[test]
/// Verifies separate seconds get separate buckets:
/// a tick in the next second opens a new (price, price) bucket.
fn next_second_opens_new_bucket() {
    let mut agg = SecondAggregator::new();
    agg.update(&Tick::new(50_000.0, 100_200)).unwrap();
    agg.update(&Tick::new(50_010.0, 100_700)).unwrap();
    agg.update(&Tick::new(50_020.0, 101_100)).unwrap();

    let rows: Vec<(String, SecondPrices)> =
        agg.iter().map(|(k, p)| (k.to_string(), p)).collect();
    assert_eq!(
        rows,
        vec![
            (
                format_second(100).unwrap(),
                SecondPrices {
                    first_price: 50_000.0,
                    last_price: 50_010.0
                }
            ),
            (
                format_second(101).unwrap(),
                SecondPrices {
                    first_price: 50_020.0,
                    last_price: 50_020.0
                }
            ),
        ]
    );
}
