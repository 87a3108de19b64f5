use clob_engine::book::OrderBook;
use clob_engine::model::{Order, OrderId, Side};
use criterion::{Criterion, criterion_group, criterion_main};

// Bids fill the low half of the price range, asks the high half, with a
// gap in between, so populating the book never crosses it.
fn setup_order_book(depth: u64, orders_per_level: u64) -> OrderBook {
    let mut book = OrderBook::new();
    for price in 1..=depth {
        for i in 0..orders_per_level {
            let buy_id = OrderId::new(format!("b-{price}-{i}")).unwrap();
            book.submit(Order::new(buy_id, Side::Buy, price, 1).unwrap())
                .unwrap();
            let ask_price = depth + price;
            let sell_id = OrderId::new(format!("s-{price}-{i}")).unwrap();
            book.submit(Order::new(sell_id, Side::Sell, ask_price, 1).unwrap())
                .unwrap();
        }
    }
    book
}

fn bench_match_order(c: &mut Criterion) {
    let depth = 100;
    let orders_per_level = 10;

    c.bench_function("sweep crossing limit order through many levels", |b| {
        b.iter_batched(
            || setup_order_book(depth, orders_per_level),
            |mut book| {
                // A sell at the lowest bid price crosses every resting bid.
                let sweeper = Order::new(
                    OrderId::new("sweeper").unwrap(),
                    Side::Sell,
                    1,
                    depth * orders_per_level,
                )
                .unwrap();
                book.submit(sweeper).unwrap();
            },
            criterion::BatchSize::SmallInput,
        )
    });

    c.bench_function("rest a non-crossing limit order", |b| {
        let mut book = setup_order_book(depth, orders_per_level);
        let mut n = 0u64;
        b.iter(|| {
            n += 1;
            // Below every resting bid and below every resting ask's
            // crossing threshold: always rests without matching.
            let order = Order::new(OrderId::new(format!("rest-{n}")).unwrap(), Side::Sell, depth * 3, 1)
                .unwrap();
            book.submit(order).unwrap();
        })
    });
}

criterion_group!(benches, bench_match_order);
criterion_main!(benches);
