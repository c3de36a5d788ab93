//! In-memory aggregator for extraction and engine tests
//!
//! Individuals and field details are addressed by synthetic object
//! addresses; the fake runtime's `new_object` slot hands those back
//! unchanged, so nothing is ever dereferenced.

use crate::aggregator::{Aggregator, Avatar, FieldDetails, Individual, QuiescentSignal};
use crate::error::{AlmanacError, Result};
use gtype_bridge::testing::{FakeCollection, FakeRuntime, StringPool};
use gtype_bridge::{
    fundamental as ft, ForeignCollection, ForeignRuntime, ObjectRef, RawHandle, TypeTag,
};
use std::cell::RefCell;
use std::sync::Arc;

const INDIVIDUAL_BASE: usize = 0x1000_0000;
const DETAIL_BASE: usize = 0x2000_0000;

fn individual_address(index: usize) -> usize {
    INDIVIDUAL_BASE + (index << 4)
}

fn detail_address(person: usize, number: usize) -> usize {
    DETAIL_BASE + (((person << 12) | number) << 4)
}

/// How `prepare` answers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quiescence {
    /// Signal straight away
    Immediate,
    /// Drop the signal without firing it
    Dropped,
    /// Hold the signal until [`FakeAggregator::fire`]
    Manual,
    /// Fail the prepare call
    Failing,
}

#[derive(Debug, Clone)]
pub struct FakePerson {
    key: String,
    id: Option<String>,
    name: Option<String>,
    numbers: Vec<(String, Option<String>)>,
    avatar: Option<Avatar>,
    detached: bool,
}

impl FakePerson {
    pub fn new(id: &str, name: &str) -> Self {
        Self {
            key: id.to_string(),
            id: Some(id.to_string()),
            name: Some(name.to_string()),
            numbers: Vec::new(),
            avatar: None,
            detached: false,
        }
    }

    /// No id and no display name; only the map key identifies it
    pub fn anonymous(key: &str) -> Self {
        Self {
            id: None,
            name: None,
            ..Self::new(key, "")
        }
    }

    pub fn number(mut self, number: &str, kind: Option<&str>) -> Self {
        self.numbers.push((number.to_string(), kind.map(str::to_string)));
        self
    }

    pub fn avatar(mut self, avatar: Avatar) -> Self {
        self.avatar = Some(avatar);
        self
    }

    /// Phone number objects that cannot be viewed as field details
    pub fn detached_details(mut self) -> Self {
        self.detached = true;
        self
    }
}

struct Handles {
    key: usize,
    numbers: Vec<(usize, Option<usize>)>,
}

struct World {
    people: Vec<FakePerson>,
    handles: Vec<Handles>,
}

pub struct FakeAggregator {
    individual_type: TypeTag,
    detail_type: TypeTag,
    quiescence: Quiescence,
    pending: RefCell<Option<QuiescentSignal>>,
    prepare_calls: RefCell<usize>,
    world: RefCell<World>,
    pool: RefCell<StringPool>,
    type_key: usize,
}

impl FakeAggregator {
    pub fn with_people(people: Vec<FakePerson>) -> (Self, Arc<dyn ForeignRuntime>) {
        let mut runtime = FakeRuntime::new();
        let individual_type = runtime.register("FolksIndividual", Some(ft::OBJECT));
        let detail_type = runtime.register("FolksPhoneFieldDetails", Some(ft::OBJECT));

        let mut pool = StringPool::default();
        let type_key = pool.handle("type");

        let aggregator = Self {
            individual_type,
            detail_type,
            quiescence: Quiescence::Immediate,
            pending: RefCell::new(None),
            prepare_calls: RefCell::new(0),
            world: RefCell::new(World { people: Vec::new(), handles: Vec::new() }),
            pool: RefCell::new(pool),
            type_key,
        };
        aggregator.set_people(people);

        (aggregator, Arc::new(runtime))
    }

    pub fn quiescence(mut self, quiescence: Quiescence) -> Self {
        self.quiescence = quiescence;
        self
    }

    /// Replace the individuals the aggregator reports
    pub fn set_people(&self, people: Vec<FakePerson>) {
        let mut pool = self.pool.borrow_mut();
        let handles = people
            .iter()
            .map(|person| Handles {
                key: pool.handle(&person.key),
                numbers: person
                    .numbers
                    .iter()
                    .map(|(number, kind)| {
                        let number = pool.handle(number);
                        (number, kind.as_deref().map(|k| pool.handle(k)))
                    })
                    .collect(),
            })
            .collect();

        *self.world.borrow_mut() = World { people, handles };
    }

    /// Fire a held quiescence signal
    pub fn fire(&self) {
        if let Some(signal) = self.pending.borrow_mut().take() {
            signal.notify();
        }
    }

    pub fn prepare_calls(&self) -> usize {
        *self.prepare_calls.borrow()
    }

    pub fn detail_object(&self, person: usize, number: usize) -> ObjectRef {
        object(detail_address(person, number))
    }
}

fn object(address: usize) -> ObjectRef {
    ObjectRef::from_raw(address as *mut std::ffi::c_void).expect("synthetic addresses are non-null")
}

impl Aggregator for FakeAggregator {
    fn prepare(&self, on_quiescent: QuiescentSignal) -> Result<()> {
        *self.prepare_calls.borrow_mut() += 1;

        match self.quiescence {
            Quiescence::Immediate => on_quiescent.notify(),
            Quiescence::Dropped => drop(on_quiescent),
            Quiescence::Manual => *self.pending.borrow_mut() = Some(on_quiescent),
            Quiescence::Failing => {
                let reason = "backend store failed to load".to_string();
                return Err(AlmanacError::AggregatorUnavailable(reason));
            }
        }
        Ok(())
    }

    fn individuals(&self) -> Option<Box<dyn ForeignCollection + '_>> {
        let world = self.world.borrow();
        let pairs = world
            .handles
            .iter()
            .enumerate()
            .map(|(i, h)| (h.key, individual_address(i)))
            .collect();

        Some(Box::new(
            FakeCollection::keyed(pairs)
                .with_key_type(ft::STRING)
                .with_value_type(self.individual_type),
        ))
    }

    fn individual(&self, object: ObjectRef) -> Option<Box<dyn Individual + '_>> {
        let address = object.address();
        if !(INDIVIDUAL_BASE..DETAIL_BASE).contains(&address) {
            return None;
        }
        let index = (address - INDIVIDUAL_BASE) >> 4;
        let person = self.world.borrow().people.get(index)?.clone();

        Some(Box::new(FakeIndividual {
            index,
            person,
            detail_type: self.detail_type,
        }))
    }

    fn field_details(&self, object: ObjectRef) -> Option<Box<dyn FieldDetails + '_>> {
        let address = object.address();
        if address < DETAIL_BASE {
            return None;
        }
        let offset = (address - DETAIL_BASE) >> 4;
        let (person, number) = (offset >> 12, offset & 0xfff);

        let world = self.world.borrow();
        if world.people.get(person)?.detached {
            return None;
        }
        let (value, kind) = *world.handles.get(person)?.numbers.get(number)?;

        Some(Box::new(FakeDetails {
            value,
            parameters: kind.map(|kind| (self.type_key, kind)).into_iter().collect(),
        }))
    }
}

struct FakeIndividual {
    index: usize,
    person: FakePerson,
    detail_type: TypeTag,
}

impl Individual for FakeIndividual {
    fn id(&self) -> Option<String> {
        self.person.id.clone()
    }

    fn display_name(&self) -> Option<String> {
        self.person.name.clone()
    }

    fn avatar(&self) -> Option<Avatar> {
        self.person.avatar.clone()
    }

    fn phone_numbers(&self) -> Option<Box<dyn ForeignCollection + '_>> {
        let objects = (0..self.person.numbers.len())
            .map(|j| detail_address(self.index, j))
            .collect();
        Some(Box::new(FakeCollection::sequential(objects).with_element_type(self.detail_type)))
    }
}

struct FakeDetails {
    value: usize,
    parameters: Vec<(usize, usize)>,
}

// SAFETY: values and parameters are pooled C strings declared as strings.
unsafe impl FieldDetails for FakeDetails {
    fn value(&self) -> RawHandle {
        RawHandle::new(self.value)
    }

    fn value_type(&self) -> TypeTag {
        ft::STRING
    }

    fn parameters(&self) -> Option<Box<dyn ForeignCollection + '_>> {
        Some(Box::new(
            FakeCollection::keyed(self.parameters.clone())
                .with_key_type(ft::STRING)
                .with_value_type(ft::STRING),
        ))
    }
}
