use std::path::PathBuf;

use anyhow::{Context, Result};

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5)).rotate_left(7).wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }

    fn pick<'a>(&mut self, items: &[&'a str]) -> &'a str {
        items[(self.next_u64() % items.len() as u64) as usize]
    }
}

const COLLEGES: [(&str, f64); 6] = [
    ("Engineering", 0.3),
    ("Arts & Sciences", 0.0),
    ("Business", 0.2),
    ("Education", -0.1),
    ("Law", -0.4),
    ("Medicine", 0.1),
];
const GENDERS: [&str; 4] = ["Man", "Woman", "Man", "Non-binary"];
const RANKS: [&str; 3] = ["Professor", "Associate Professor", "Assistant Professor"];
const DISCIPLINES: [&str; 4] = ["STEM", "Social Sciences", "Humanities", "Business"];
const RACES: [&str; 4] = [
    "White",
    "Asian",
    "Black or African American",
    "Hispanic or Latino/a/x",
];
const TENURE: [&str; 6] = [
    "0-2 years",
    "3-5 years",
    "6-10 years",
    "11-15 years",
    "16-20 years",
    "More than 20 years",
];

/// Likert answer around `latent`, occasionally left blank.
fn likert(rng: &mut SimpleRng, latent: f64, noise: f64) -> String {
    if rng.next_f64() < 0.04 {
        return String::new();
    }
    rng.gauss(latent, noise).round().clamp(1.0, 5.0).to_string()
}

fn main() -> Result<()> {
    let output_path = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("sample_faculty_survey.csv"));
    let n_responses = 400;
    let mut rng = SimpleRng::new(42);

    let mut writer = csv::Writer::from_path(&output_path)
        .with_context(|| format!("could not create {}", output_path.display()))?;
    writer.write_record([
        "ResponseID",
        "College",
        "Gender",
        "Rank",
        "Discipline",
        "Race",
        "YearsAtInstitution",
        "Q8_OverallSatisfaction",
        "Q9_LikelihoodToRecommend",
        "Q10_ConsideredLeaving",
        "Q13_WorkLifeBalance",
        "Q22_Compensation",
        "Q26_PsychologicalSafety",
        "Q27_Belonging",
    ])?;

    for id in 1..=n_responses {
        let (college, college_shift) = COLLEGES[(rng.next_u64() % COLLEGES.len() as u64) as usize];
        let tenure_idx = (rng.next_u64() % TENURE.len() as u64) as usize;
        // Satisfaction dips mid-career and recovers for long-tenured staff.
        let tenure_shift = [0.2, 0.0, -0.2, -0.1, 0.1, 0.3][tenure_idx];
        let latent = rng.gauss(3.4 + college_shift + tenure_shift, 0.7);

        let record = [
            id.to_string(),
            college.to_string(),
            rng.pick(&GENDERS).to_string(),
            rng.pick(&RANKS).to_string(),
            rng.pick(&DISCIPLINES).to_string(),
            rng.pick(&RACES).to_string(),
            TENURE[tenure_idx].to_string(),
            likert(&mut rng, latent, 0.5),
            likert(&mut rng, latent, 0.8),
            likert(&mut rng, 6.0 - latent, 0.9),
            likert(&mut rng, latent - 0.3, 0.9),
            likert(&mut rng, latent - 0.5, 1.0),
            likert(&mut rng, latent + 0.1, 0.8),
            likert(&mut rng, latent, 0.7),
        ];
        writer.write_record(&record)?;
    }
    writer.flush()?;

    println!("Wrote {n_responses} responses to {}", output_path.display());
    Ok(())
}
