/// Per-sector expected ratios used to benchmark a company's metrics against
/// its peers. Carried verbatim from the upstream settings table.
pub struct SectorBenchmark {
    pub pe: f64,
    pub debt_to_equity: f64,
    pub margin: f64,
    pub growth: f64,
    pub fcf_margin: f64,
    pub roe: f64,
}

pub const DEFAULT_SECTOR: &str = "Default";

pub fn benchmark_for(sector: Option<&str>) -> SectorBenchmark {
    match sector {
        Some("Technology") => SectorBenchmark {
            pe: 25.0,
            debt_to_equity: 0.5,
            margin: 0.15,
            growth: 0.20,
            fcf_margin: 0.15,
            roe: 0.15,
        },
        Some("Healthcare") => SectorBenchmark {
            pe: 20.0,
            debt_to_equity: 0.6,
            margin: 0.12,
            growth: 0.15,
            fcf_margin: 0.12,
            roe: 0.12,
        },
        Some("Financial Services") => SectorBenchmark {
            pe: 12.0,
            debt_to_equity: 1.5,
            margin: 0.30,
            growth: 0.08,
            fcf_margin: 0.20,
            roe: 0.12,
        },
        Some("Energy") => SectorBenchmark {
            pe: 10.0,
            debt_to_equity: 0.8,
            margin: 0.10,
            growth: 0.05,
            fcf_margin: 0.15,
            roe: 0.10,
        },
        _ => SectorBenchmark {
            pe: 20.0,
            debt_to_equity: 0.7,
            margin: 0.10,
            growth: 0.10,
            fcf_margin: 0.10,
            roe: 0.10,
        },
    }
}
