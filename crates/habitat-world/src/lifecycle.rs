//! Per-tick update rules for animals and plants.
//!
//! The scheduler takes the acting organism out of the population map, hands
//! it to [`act`] together with a [`TickContext`], and puts it back
//! afterwards. Everything here mutates the field immediately, so organisms
//! acting later in the same tick see cells vacated or filled earlier.

use crate::field::Field;
use crate::organism::Organism;
use crate::search::{sensory_search, SearchOutcome};
use habitat_core::{
    DeathCause, EcologyRules, Gender, IdSequence, InfectionProfile, Location, OrganismId,
    RecoveryPolicy, SpeciesDescriptor, SpeciesId, SpeciesTable, TickTally, WeatherConfig,
};
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use std::collections::BTreeMap;
use tracing::{debug, trace, warn};

/// Everything an organism may touch while it acts
pub(crate) struct TickContext<'a> {
    pub field: &'a mut Field,
    /// The rest of the population; the acting organism is not in here
    pub organisms: &'a mut BTreeMap<OrganismId, Organism>,
    pub species: &'a SpeciesTable,
    pub weather: &'a WeatherConfig,
    pub rules: &'a EcologyRules,
    pub rng: &'a mut ChaCha8Rng,
    pub ids: &'a mut IdSequence,
    /// Newborns placed on the field this tick, merged after the pass
    pub births: &'a mut Vec<Organism>,
    pub tally: &'a mut TickTally,
    pub tick: u64,
}

/// What an animal is looking for this tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Goal {
    Food,
    Mate,
    Wander,
}

/// Run one tick of behaviour for a live organism
pub(crate) fn act(ctx: &mut TickContext<'_>, organism: &mut Organism) {
    let species = ctx.species;
    let descriptor = species.get(organism.species);
    if organism.is_animal() {
        act_animal(ctx, organism, descriptor);
    } else {
        act_plant(ctx, organism, descriptor);
    }
}

/// Mark an organism dead and take it off the field
fn bury(field: &mut Field, tally: &mut TickTally, organism: &mut Organism, cause: DeathCause, tick: u64) {
    if !organism.is_alive() {
        return;
    }
    organism.set_dead(cause);
    if let Err(err) = field.remove(organism.id, organism.location) {
        warn!(
            event = "occupancy_mismatch",
            organism_id = %organism.id,
            tick,
            "Dead organism was not where it claimed to be: {}",
            err
        );
    }
    tally.record_death(cause);
    debug!(
        event = "organism_death",
        organism_id = %organism.id,
        species = %organism.species,
        cause = %cause,
        age = organism.age,
        energy = organism.energy,
        tick,
        "Organism died"
    );
}

fn kill(ctx: &mut TickContext<'_>, organism: &mut Organism, cause: DeathCause) {
    bury(ctx.field, ctx.tally, organism, cause, ctx.tick);
}

/// Move to `to`, keeping cell membership and the organism's own location in step
fn step_to(ctx: &mut TickContext<'_>, organism: &mut Organism, to: Location) -> bool {
    if to == organism.location {
        return true;
    }
    match ctx.field.relocate(organism.id, organism.location, to) {
        Ok(()) => {
            organism.move_to(to);
            true
        }
        Err(err) => {
            trace!(organism_id = %organism.id, destination = %to, "Move refused: {}", err);
            false
        }
    }
}

/// Occupants of `loc` and every cell within `radius` of it, excluding `organism` itself
fn neighbours_of(field: &Field, organism: &Organism, radius: i32) -> Vec<OrganismId> {
    std::iter::once(organism.location)
        .chain(field.locations_within_radius(organism.location, radius))
        .flat_map(|loc| field.occupants(loc).iter().copied())
        .filter(|id| *id != organism.id)
        .collect()
}

fn can_breed(organism: &Organism, descriptor: &SpeciesDescriptor) -> bool {
    organism.is_alive()
        && organism.age >= descriptor.breeding_age
        && organism
            .animal()
            .map_or(false, |state| state.breeding_cooldown == 0)
}

fn act_animal(ctx: &mut TickContext<'_>, organism: &mut Organism, descriptor: &SpeciesDescriptor) {
    if let Some(state) = organism.animal_mut() {
        state.breeding_cooldown = state.breeding_cooldown.saturating_sub(1);
    }

    let quadrant = ctx.field.clock().quadrant();
    if !descriptor.active_hours.is_active(quadrant) {
        // asleep: only age and rest
        if organism.grow_older(descriptor.max_age) {
            kill(ctx, organism, DeathCause::OldAge);
            return;
        }
        organism.add_energy(descriptor.rest_recovery, descriptor.max_energy);
        if organism.energy <= 0 {
            kill(ctx, organism, DeathCause::Starvation);
        }
        return;
    }

    if organism.grow_older(descriptor.max_age) {
        kill(ctx, organism, DeathCause::OldAge);
        return;
    }

    if !organism.consume_energy(descriptor.metabolism) {
        kill(ctx, organism, DeathCause::Starvation);
        return;
    }

    if organism.is_infected() {
        if let Some(profile) = &descriptor.infection {
            progress_infection(ctx, organism, profile);
            if !organism.is_alive() {
                return;
            }
        }
    }

    let effect = ctx.weather.effect(ctx.field.weather_at(organism.location));
    let sight = (descriptor.sight_radius as i32 + effect.sight_delta).max(0) as u32;

    let hungry = organism.energy < descriptor.hunger_threshold && !descriptor.diet.is_empty();
    let goal = if hungry {
        Goal::Food
    } else if can_breed(organism, descriptor) {
        Goal::Mate
    } else {
        Goal::Wander
    };

    let outcome = match goal {
        Goal::Food => search_food(ctx, organism, descriptor, sight),
        Goal::Mate => search_mate(ctx, organism, sight),
        Goal::Wander => None,
    };
    if let Some(found) = outcome {
        trace!(organism_id = %organism.id, goal = ?goal, towards = %found.location(), tick = ctx.tick, "Search hit");
    }

    match (goal, outcome) {
        (Goal::Food, Some(SearchOutcome::Reached(target))) => {
            eat_at(ctx, organism, descriptor, target);
            if !organism.is_alive() {
                return;
            }
        }
        // mate already within reach: stay put
        (_, Some(SearchOutcome::Reached(_))) => {}
        (_, Some(SearchOutcome::Step(step))) => {
            step_to(ctx, organism, step);
        }
        (_, None) => match ctx.field.free_adjacent_location(organism.location, ctx.rng) {
            Some(free) => {
                step_to(ctx, organism, free);
            }
            None => {
                kill(ctx, organism, DeathCause::Overcrowding);
                return;
            }
        },
    }

    try_breed(ctx, organism, descriptor);
}

fn search_food(
    ctx: &mut TickContext<'_>,
    organism: &Organism,
    descriptor: &SpeciesDescriptor,
    sight: u32,
) -> Option<SearchOutcome> {
    let organisms = &*ctx.organisms;
    let outcome = sensory_search(ctx.field, organism.location, sight, ctx.rng, |id| {
        organisms
            .get(&id)
            .map_or(false, |other| other.is_alive() && descriptor.eats(other.species))
    });
    if outcome.is_none() {
        trace!(organism_id = %organism.id, sight, tick = ctx.tick, "No food in sight");
    }
    outcome
}

fn search_mate(ctx: &mut TickContext<'_>, organism: &Organism, sight: u32) -> Option<SearchOutcome> {
    let Some(gender) = organism.gender() else {
        return None;
    };
    let organisms = &*ctx.organisms;
    let species = organism.species;
    let outcome = sensory_search(ctx.field, organism.location, sight, ctx.rng, |id| {
        organisms.get(&id).map_or(false, |other| {
            other.is_alive() && other.species == species && other.gender() == Some(gender.opposite())
        })
    });
    if outcome.is_none() {
        trace!(organism_id = %organism.id, sight, tick = ctx.tick, "No mate in sight");
    }
    outcome
}

/// Eat the first edible occupant of `target`, then step into the cell if it has room.
fn eat_at(
    ctx: &mut TickContext<'_>,
    organism: &mut Organism,
    descriptor: &SpeciesDescriptor,
    target: Location,
) {
    let prey_id = ctx.field.occupants(target).iter().copied().find(|id| {
        ctx.organisms
            .get(id)
            .map_or(false, |prey| prey.is_alive() && descriptor.eats(prey.species))
    });
    let Some(prey) = prey_id.and_then(|id| ctx.organisms.get_mut(&id)) else {
        return;
    };

    let species = ctx.species;
    let prey_descriptor = species.get(prey.species);
    let nutrition = if prey.is_animal() || prey_descriptor.grazing_fraction >= 1.0 {
        bury(ctx.field, ctx.tally, prey, DeathCause::Eaten, ctx.tick);
        prey_descriptor.food_value
    } else {
        let fraction = prey_descriptor.grazing_fraction;
        let bite = (prey_descriptor.max_energy as f64 * fraction).ceil() as i32;
        prey.energy -= bite.max(1);
        if prey.energy <= 0 {
            bury(ctx.field, ctx.tally, prey, DeathCause::Eaten, ctx.tick);
        }
        (prey_descriptor.food_value as f64 * fraction).round() as i32
    };

    if prey_descriptor.poisonous {
        organism.add_energy(-nutrition, descriptor.max_energy);
        if organism.energy <= 0 {
            kill(ctx, organism, DeathCause::Poisoned);
            return;
        }
    } else {
        organism.add_energy(nutrition, descriptor.max_energy);
    }

    if ctx.field.is_free(target) {
        step_to(ctx, organism, target);
    }
}

/// Drain energy, spread to neighbours and count the infection down.
fn progress_infection(ctx: &mut TickContext<'_>, organism: &mut Organism, profile: &InfectionProfile) {
    if !organism.consume_energy(profile.energy_penalty) {
        kill(ctx, organism, DeathCause::Disease);
        return;
    }

    for id in neighbours_of(ctx.field, organism, profile.spread_radius) {
        let Some(other) = ctx.organisms.get_mut(&id) else {
            continue;
        };
        let susceptible = other.is_alive()
            && other.species == organism.species
            && other
                .animal()
                .map_or(false, |state| state.infection.is_none() && !state.immune);
        if susceptible && ctx.rng.gen_bool(profile.spread_probability) && other.infect(profile.duration) {
            ctx.tally.new_infections += 1;
            debug!(
                event = "infection_spread",
                from = %organism.id,
                to = %id,
                tick = ctx.tick,
                "Infection spread"
            );
        }
    }

    let expired = match organism.animal_mut() {
        Some(state) => match state.infection.as_mut() {
            Some(infection) => {
                infection.remaining = infection.remaining.saturating_sub(1);
                if infection.remaining == 0 {
                    state.infection = None;
                    true
                } else {
                    false
                }
            }
            None => false,
        },
        None => false,
    };
    if !expired {
        return;
    }

    let dies = match profile.recovery {
        RecoveryPolicy::Recover { immune } => {
            if let Some(state) = organism.animal_mut() {
                state.immune = immune;
            }
            false
        }
        RecoveryPolicy::Die => true,
        RecoveryPolicy::Chance { fatality } => {
            let dies = ctx.rng.gen_bool(fatality);
            if !dies {
                if let Some(state) = organism.animal_mut() {
                    state.immune = true;
                }
            }
            dies
        }
    };
    if dies {
        kill(ctx, organism, DeathCause::Disease);
    }
}

/// Whether an opposite-gender member of the same species shares or borders the organism's cell
fn mate_adjacent(ctx: &TickContext<'_>, organism: &Organism, gender: Gender) -> bool {
    neighbours_of(ctx.field, organism, 1)
        .iter()
        .filter_map(|id| ctx.organisms.get(id))
        .any(|other| {
            other.is_alive()
                && other.species == organism.species
                && other.gender() == Some(gender.opposite())
        })
}

fn try_breed(ctx: &mut TickContext<'_>, organism: &mut Organism, descriptor: &SpeciesDescriptor) {
    if organism.gender() != Some(Gender::Female) || !can_breed(organism, descriptor) {
        return;
    }
    if !mate_adjacent(ctx, organism, Gender::Female) {
        return;
    }
    if descriptor.max_litter_size == 0 || !ctx.rng.gen_bool(descriptor.breeding_probability) {
        return;
    }

    let litter = ctx.rng.gen_range(1..=descriptor.max_litter_size);
    let born = give_birth(ctx, organism.species, descriptor, organism.location, litter);
    if born > 0 {
        if let Some(state) = organism.animal_mut() {
            state.breeding_cooldown = descriptor.breeding_cooldown;
        }
        debug!(
            event = "litter_born",
            parent_id = %organism.id,
            species = %organism.species,
            litter,
            born,
            tick = ctx.tick,
            "Litter born"
        );
    }
}

/// Place up to `count` newborns in free cells around `origin`.
///
/// Returns how many found room.
fn give_birth(
    ctx: &mut TickContext<'_>,
    species: SpeciesId,
    descriptor: &SpeciesDescriptor,
    origin: Location,
    count: u32,
) -> u32 {
    let mut born = 0;
    for _ in 0..count {
        let Some(loc) = ctx.field.free_adjacent_location(origin, ctx.rng) else {
            break;
        };
        let id = ctx.ids.next_id();
        if ctx.field.place(id, loc).is_err() {
            break;
        }
        let gender = Gender::random(ctx.rng);
        ctx.births.push(Organism::new(id, species, descriptor, loc, gender));
        ctx.tally.births += 1;
        born += 1;
    }
    born
}

fn act_plant(ctx: &mut TickContext<'_>, organism: &mut Organism, descriptor: &SpeciesDescriptor) {
    if organism.grow_older(descriptor.max_age) {
        kill(ctx, organism, DeathCause::OldAge);
        return;
    }
    organism.add_energy(descriptor.growth_per_tick, descriptor.max_energy);
    if organism.energy <= 0 {
        kill(ctx, organism, DeathCause::Starvation);
        return;
    }

    if ctx.rules.plant_competition && loses_competition(ctx, organism, descriptor) {
        kill(ctx, organism, DeathCause::Competition);
        return;
    }

    if organism.age < descriptor.breeding_age || descriptor.max_litter_size == 0 {
        return;
    }
    let clock = ctx.field.clock();
    if ctx.rules.plants_need_daylight && clock.is_night() {
        return;
    }
    let effect = ctx.weather.effect(ctx.field.weather_at(organism.location));
    if effect.blocks_seeding {
        return;
    }

    let probability = (descriptor.breeding_probability
        * effect.seed_multiplier
        * ctx.rules.season_multiplier(clock.season()))
    .clamp(0.0, 1.0);
    if ctx.rng.gen_bool(probability) {
        let seeds = ctx.rng.gen_range(1..=descriptor.max_litter_size);
        give_birth(ctx, organism.species, descriptor, organism.location, seeds);
    }
}

/// A crowded plant loses to a neighbouring plant of another species with a higher survival rate
fn loses_competition(ctx: &TickContext<'_>, organism: &Organism, descriptor: &SpeciesDescriptor) -> bool {
    let field: &Field = ctx.field;
    let organisms = &*ctx.organisms;
    let species = ctx.species;

    let neighbours = field.locations_within_radius(organism.location, 1);
    let free = neighbours.iter().filter(|loc| field.is_free(**loc)).count();
    if free > ctx.rules.competition_threshold {
        return false;
    }

    neighbours
        .iter()
        .flat_map(|loc| field.occupants(*loc).iter())
        .filter_map(|id| organisms.get(id))
        .any(|other| {
            other.is_alive()
                && !other.is_animal()
                && other.species != organism.species
                && species.get(other.species).survival_rate > descriptor.survival_rate
        })
}
