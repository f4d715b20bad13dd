//! Stage 1 of the entity pipeline: replicate/sample developers from the seed (§4.1) into
//! first-class `Developer` entities. Roster sizing (clone-by-suffix or sample-without-
//! replacement) already happened in `seed::resolve_developer_count`; this stage only lifts
//! the resolved `DeveloperSeed`s into `Developer`s.

use crate::models::Developer;
use crate::seed::DeveloperSeed;

pub fn generate(seeds: Vec<DeveloperSeed>) -> Vec<Developer> {
    seeds
        .into_iter()
        .map(|s| Developer {
            id: s.id,
            display_name: s.display_name,
            email: s.email,
            team: s.team,
            division: s.division,
            organization: s.organization,
            region: s.region,
            timezone: s.timezone,
            seniority: s.seniority,
            params: s.params,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seed::synthesize_default_roster;

    #[test]
    fn lifts_every_seed_into_a_developer() {
        let seeds = synthesize_default_roster(3);
        let developers = generate(seeds);
        assert_eq!(developers.len(), 3);
    }
}
