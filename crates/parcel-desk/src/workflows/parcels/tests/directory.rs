use super::common::*;
use crate::storage::{MemoryStore, RecordStore, StoreError};
use crate::workflows::parcels::address::{AddressError, BuildingRoster};
use crate::workflows::parcels::directory::{DirectoryError, ResidentDirectory};
use crate::workflows::parcels::domain::{PhoneError, PhoneNumber, Resident};

fn directory(
    residents: Vec<Resident>,
) -> (MemoryStore<Resident>, ResidentDirectory<MemoryStore<Resident>>) {
    let store = MemoryStore::with_records(residents);
    let directory = ResidentDirectory::open(store.clone(), BuildingRoster::standard())
        .expect("directory opens");
    (store, directory)
}

#[test]
fn find_by_unit_keeps_registration_order() {
    let other = resident("Ana Lima", "1", "201", "11977776666");
    let (_, directory) = directory(vec![maria(), other, joao()]);

    let names: Vec<&str> = directory
        .find_by_unit(&unit("4", "204"))
        .into_iter()
        .map(|resident| resident.name.as_str())
        .collect();
    assert_eq!(names, ["Maria Silva", "Joao Souza"]);
    assert!(directory.find_by_unit(&unit("8", "804")).is_empty());
}

#[test]
fn register_canonicalises_phone_and_persists() {
    let (store, mut directory) = directory(Vec::new());

    let resident = directory
        .register("  Carla Dias ", &unit("2", "302"), "21912345678")
        .expect("registration succeeds");

    assert_eq!(resident.name, "Carla Dias");
    assert_eq!(resident.phone.as_str(), "+5521912345678");
    assert_eq!(store.records(), vec![resident.clone()]);
    assert_eq!(
        directory.find_by_phone(&PhoneNumber::canonicalize("21912345678")),
        Some(&resident)
    );
}

#[test]
fn register_rejects_duplicate_phone_anywhere_in_building() {
    let (store, mut directory) = directory(vec![maria()]);

    match directory.register("Someone Else", &unit("7", "701"), "11999999999") {
        Err(DirectoryError::DuplicatePhone(phone)) => {
            assert_eq!(phone.as_str(), "+5511999999999")
        }
        other => panic!("expected duplicate phone, got {other:?}"),
    }
    assert_eq!(store.save_count(), 0);
}

#[test]
fn register_validates_before_writing() {
    let (store, mut directory) = directory(Vec::new());

    assert!(matches!(
        directory.register("   ", &unit("4", "204"), "11999999999"),
        Err(DirectoryError::EmptyName)
    ));
    assert!(matches!(
        directory.register("Maria", &unit("4", "204"), "1199999999"),
        Err(DirectoryError::InvalidPhone(PhoneError::WrongLength { length: 10 }))
    ));
    assert!(matches!(
        directory.register("Maria", &unit("4", "204"), "11-99999999"),
        Err(DirectoryError::InvalidPhone(PhoneError::NonNumeric))
    ));
    assert!(matches!(
        directory.register("Maria", &unit("9", "204"), "11999999999"),
        Err(DirectoryError::InvalidAddress(AddressError::UnknownUnit { .. }))
    ));

    assert_eq!(store.save_count(), 0);
    assert!(directory.residents().is_empty());
}

#[test]
fn failed_save_leaves_directory_unchanged() {
    let (store, mut directory) = directory(vec![maria()]);
    store.set_unavailable(true);

    assert!(matches!(
        directory.register("Joao", &unit("4", "204"), "11988887777"),
        Err(DirectoryError::Store(StoreError::Unavailable(_)))
    ));
    assert_eq!(directory.residents(), &[maria()]);
}

#[test]
fn reload_sees_out_of_band_edits() {
    let (store, mut directory) = directory(vec![maria()]);
    store.replace(vec![maria(), joao()]);

    assert_eq!(directory.find_by_unit(&unit("4", "204")).len(), 1);
    directory.reload().expect("reload succeeds");
    assert_eq!(directory.find_by_unit(&unit("4", "204")).len(), 2);
    assert_eq!(store.load().expect("load").len(), 2);
}
