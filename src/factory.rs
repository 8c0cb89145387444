//! Sample problem instances over a fixed six-spoke, two-hub network.

use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal, NormalError};

use crate::models::Problem;

/// Lower bound for randomly generated shipment quantities
const MIN_QTY: i32 = 50;

/// Network with spokes A-F, hubs G and H, two truck types, load times and routes.
pub fn fixed_network() -> Problem {
    let mut pb = Problem::new();

    let a = pb.add_spoke("A", 360, 1080);
    let b = pb.add_spoke("B", 400, 1150);
    let c = pb.add_spoke("C", 380, 1200);
    let d = pb.add_spoke("D", 340, 900);
    let e = pb.add_spoke("E", 420, 800);
    let f = pb.add_spoke("F", 370, 1070);

    let g = pb.add_hub("G");
    let h = pb.add_hub("H");

    let small_truck = pb.add_truck_type("SmallTruck", 400, 10, 55);
    let big_truck = pb.add_truck_type("BigTruck", 700, 15, 45);

    pb.add_load_time(&g, &small_truck, 30);
    pb.add_load_time(&g, &big_truck, 55);
    pb.add_load_time(&h, &small_truck, 35);
    pb.add_load_time(&h, &big_truck, 50);

    pb.add_route(&a, &g, 200);
    pb.add_route(&a, &h, 50);
    pb.add_route(&b, &g, 120);
    pb.add_route(&b, &h, 100);
    pb.add_route(&c, &h, 110);
    pb.add_route(&d, &g, 70);
    pb.add_route(&d, &h, 100);
    pb.add_route(&e, &g, 120);
    pb.add_route(&e, &h, 100);
    pb.add_route(&f, &h, 105);

    pb
}

/// The fixed network with a fixed set of 30 shipment orders.
pub fn problem_with_fixed_shipments() -> Problem {
    #[rustfmt::skip]
    const SHIPMENTS: [(&str, &str, i32); 30] = [
        ("A", "B", 300), ("A", "C", 250), ("A", "D", 350), ("A", "E", 145), ("A", "F", 300),
        ("B", "A", 185), ("B", "C", 200), ("B", "D", 221), ("B", "E", 263), ("B", "F", 197),
        ("C", "A", 143), ("C", "B", 178), ("C", "D", 258), ("C", "E", 221), ("C", "F", 106),
        ("D", "A", 75), ("D", "B", 135), ("D", "C", 245), ("D", "E", 283), ("D", "F", 155),
        ("E", "A", 123), ("E", "B", 234), ("E", "C", 143), ("E", "D", 78), ("E", "F", 107),
        ("F", "A", 201), ("F", "B", 157), ("F", "C", 169), ("F", "D", 212), ("F", "E", 104),
    ];

    let mut pb = fixed_network();
    let spokes = pb.spokes.clone();
    let by_name = |name: &str| spokes.iter().find(|s| s.name == name).cloned();
    for (origin, destination, quantity) in SHIPMENTS {
        if let (Some(origin), Some(destination)) = (by_name(origin), by_name(destination)) {
            pb.add_shipment(&origin, &destination, quantity);
        }
    }
    pb
}

/// The fixed network with one shipment per ordered spoke pair, quantities drawn
/// from a seeded Gaussian and floored at [`MIN_QTY`].
///
/// Fails with `BadVariance` for a negative or non-finite standard deviation.
pub fn problem_with_random_shipments(
    seed: u64,
    mean_qty: f64,
    standard_deviation: f64,
) -> Result<Problem, NormalError> {
    if standard_deviation < 0.0 {
        return Err(NormalError::BadVariance);
    }
    let normal = Normal::new(mean_qty, standard_deviation)?;
    let mut rng = StdRng::seed_from_u64(seed);

    let mut pb = fixed_network();
    let spokes = pb.spokes.clone();
    for source in &spokes {
        for destination in &spokes {
            if source.name != destination.name {
                let quantity = (normal.sample(&mut rng) as i32).max(MIN_QTY);
                pb.add_shipment(source, destination, quantity);
            }
        }
    }
    Ok(pb)
}
