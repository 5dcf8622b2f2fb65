//! Building and persisting mixture tables for several profiles.

use mogfit_rs::fitting::{fit_profiles_parallel, MixtureSearch, MixtureSearchConfig, MixtureTable};
use mogfit_rs::profiles::Profile;

fn config() -> MixtureSearchConfig {
    MixtureSearchConfig::default().with_max_components(2)
}

#[test]
fn test_parallel_matches_sequential() {
    let outcomes = fit_profiles_parallel(&Profile::ALL, &config(), 100).unwrap();
    assert_eq!(outcomes.len(), 2);

    for (i, outcome) in outcomes.iter().enumerate() {
        assert_eq!(outcome.profile, Profile::ALL[i]);

        let mut search = MixtureSearch::new(Profile::ALL[i], config()).unwrap();
        let sequential = search.run_seeded(100 + i as u64).unwrap();
        assert_eq!(outcome.records, sequential.records);
    }
}

#[test]
fn test_table_round_trip_for_both_profiles() {
    let outcomes = fit_profiles_parallel(&Profile::ALL, &config(), 7).unwrap();
    let table: MixtureTable = outcomes.iter().flat_map(|o| o.fits()).collect();

    assert_eq!(table.len(), 4);
    for profile in Profile::ALL {
        for k in 1..=2 {
            let fit = table.get(profile, k).unwrap();
            assert_eq!(fit.amp.len(), k);
            assert_eq!(fit.var.len(), k);
            assert!(fit.var.windows(2).all(|w| w[0] <= w[1]));
        }
        assert!(table.best(profile).unwrap().badness <= table.get(profile, 1).unwrap().badness);
    }

    let path = std::env::temp_dir().join("mogfit_profile_tables.json");
    table.save_json(&path).unwrap();
    let loaded = MixtureTable::load_json(&path).unwrap();
    let _ = std::fs::remove_file(&path);
    assert_eq!(loaded, table);
}
