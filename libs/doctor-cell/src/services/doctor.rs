use std::collections::BTreeMap;

use tracing::{debug, info, warn};

use shared_database::{keys, Database};

use crate::models::{
    CreateDoctorRequest, Doctor, DoctorError, DoctorSearchFilters, DoctorStatus, Slot, Specialty,
    UpdateDoctorRequest,
};

const MIN_LICENSE_LENGTH: usize = 5;

pub struct DoctorService {
    db: Database,
}

impl DoctorService {
    pub fn new(db: &Database) -> Self {
        Self { db: db.clone() }
    }

    // ==========================================================================
    // CATALOG READS
    // ==========================================================================

    pub async fn list_all(&self) -> Vec<Doctor> {
        self.db.collection(keys::DOCTORS).await
    }

    /// Doctors patients can browse and book.
    pub async fn list_active(&self) -> Vec<Doctor> {
        self.list_all()
            .await
            .into_iter()
            .filter(Doctor::is_active)
            .collect()
    }

    pub async fn get(&self, doctor_id: i64) -> Result<Doctor, DoctorError> {
        self.list_all()
            .await
            .into_iter()
            .find(|d| d.id == doctor_id)
            .ok_or(DoctorError::NotFound(doctor_id))
    }

    pub async fn get_active(&self, doctor_id: i64) -> Result<Doctor, DoctorError> {
        let doctor = self.get(doctor_id).await?;
        if !doctor.is_active() {
            debug!("Doctor {} is inactive", doctor_id);
            return Err(DoctorError::Inactive(doctor_id));
        }
        Ok(doctor)
    }

    pub async fn specialties(&self) -> Vec<Specialty> {
        self.db.collection(keys::SPECIALTIES).await
    }

    pub async fn search(&self, filters: &DoctorSearchFilters) -> Vec<Doctor> {
        self.list_all()
            .await
            .into_iter()
            .filter(|d| matches_filters(d, filters))
            .collect()
    }

    // ==========================================================================
    // ADMIN MANAGEMENT
    // ==========================================================================

    pub async fn create_doctor(&self, request: CreateDoctorRequest) -> Result<Doctor, DoctorError> {
        let errors = validate_doctor_fields(
            Some(&request.name),
            Some(&request.email),
            Some(&request.specialty),
            Some(&request.license_number),
        );
        if !errors.is_empty() {
            return Err(DoctorError::InvalidFields(errors));
        }

        let doctor = self
            .db
            .transact(|tx| {
                let mut doctors: Vec<Doctor> = tx.collection(keys::DOCTORS);
                let email = request.email.trim().to_lowercase();
                if doctors.iter().any(|d| d.email.to_lowercase() == email) {
                    return Err(DoctorError::DuplicateEmail(email));
                }

                let doctor = Doctor {
                    id: doctors.iter().map(|d| d.id).max().unwrap_or(0) + 1,
                    name: request.name.trim().to_string(),
                    email,
                    password: request.password.clone().unwrap_or_default(),
                    specialty: request.specialty.trim().to_string(),
                    specialty_id: request.specialty_id,
                    user_id: request.user_id.clone(),
                    hospital: request.hospital.clone().unwrap_or_default(),
                    credentials: request.credentials.clone().unwrap_or_default(),
                    image: request.image.clone().unwrap_or_default(),
                    license_number: request.license_number.trim().to_string(),
                    status: request.status.unwrap_or_default(),
                };

                doctors.push(doctor.clone());
                tx.put_collection(keys::DOCTORS, &doctors)?;
                Ok(doctor)
            })
            .await?;

        info!("Created doctor {} ({})", doctor.id, doctor.name);
        Ok(doctor)
    }

    pub async fn update_doctor(
        &self,
        doctor_id: i64,
        request: UpdateDoctorRequest,
    ) -> Result<Doctor, DoctorError> {
        let errors = validate_doctor_fields(
            request.name.as_ref(),
            request.email.as_ref(),
            request.specialty.as_ref(),
            request.license_number.as_ref(),
        );
        if !errors.is_empty() {
            return Err(DoctorError::InvalidFields(errors));
        }

        let doctor = self
            .db
            .transact(|tx| {
                let mut doctors: Vec<Doctor> = tx.collection(keys::DOCTORS);

                if let Some(email) = &request.email {
                    let email = email.trim().to_lowercase();
                    if doctors.iter().any(|d| d.id != doctor_id && d.email.to_lowercase() == email) {
                        return Err(DoctorError::DuplicateEmail(email));
                    }
                }

                let doctor = doctors
                    .iter_mut()
                    .find(|d| d.id == doctor_id)
                    .ok_or(DoctorError::NotFound(doctor_id))?;

                if let Some(name) = &request.name {
                    doctor.name = name.trim().to_string();
                }
                if let Some(email) = &request.email {
                    doctor.email = email.trim().to_lowercase();
                }
                if let Some(password) = &request.password {
                    doctor.password = password.clone();
                }
                if let Some(specialty) = &request.specialty {
                    doctor.specialty = specialty.trim().to_string();
                }
                if request.specialty_id.is_some() {
                    doctor.specialty_id = request.specialty_id;
                }
                if let Some(hospital) = &request.hospital {
                    doctor.hospital = hospital.clone();
                }
                if let Some(credentials) = &request.credentials {
                    doctor.credentials = credentials.clone();
                }
                if let Some(image) = &request.image {
                    doctor.image = image.clone();
                }
                if let Some(license) = &request.license_number {
                    doctor.license_number = license.trim().to_string();
                }
                if let Some(status) = request.status {
                    doctor.status = status;
                }

                let updated = doctor.clone();
                tx.put_collection(keys::DOCTORS, &doctors)?;
                Ok(updated)
            })
            .await?;

        info!("Updated doctor {}", doctor_id);
        Ok(doctor)
    }

    /// Removes the doctor and their slots. Appointments stay as history.
    pub async fn delete_doctor(&self, doctor_id: i64) -> Result<(), DoctorError> {
        let removed_slots = self
            .db
            .transact(|tx| {
                let mut doctors: Vec<Doctor> = tx.collection(keys::DOCTORS);
                let before = doctors.len();
                doctors.retain(|d| d.id != doctor_id);
                if doctors.len() == before {
                    return Err(DoctorError::NotFound(doctor_id));
                }

                let mut slots: Vec<Slot> = tx.collection(keys::APPOINTMENT_SLOTS);
                let slot_count = slots.len();
                slots.retain(|s| s.doctor_id != doctor_id);

                tx.put_collection(keys::DOCTORS, &doctors)?;
                tx.put_collection(keys::APPOINTMENT_SLOTS, &slots)?;
                Ok::<_, DoctorError>(slot_count - slots.len())
            })
            .await?;

        warn!("Deleted doctor {} and {} of their slots", doctor_id, removed_slots);
        Ok(())
    }

    pub async fn toggle_status(&self, doctor_id: i64) -> Result<Doctor, DoctorError> {
        let doctor = self
            .db
            .transact(|tx| {
                let mut doctors: Vec<Doctor> = tx.collection(keys::DOCTORS);
                let doctor = doctors
                    .iter_mut()
                    .find(|d| d.id == doctor_id)
                    .ok_or(DoctorError::NotFound(doctor_id))?;
                doctor.status = doctor.status.toggled();

                let updated = doctor.clone();
                tx.put_collection(keys::DOCTORS, &doctors)?;
                Ok::<_, DoctorError>(updated)
            })
            .await?;

        info!("Doctor {} is now {:?}", doctor_id, doctor.status);
        Ok(doctor)
    }
}

fn matches_filters(doctor: &Doctor, filters: &DoctorSearchFilters) -> bool {
    let text_match = match filters.q.as_deref().map(str::trim) {
        None | Some("") => true,
        Some(q) => {
            let q = q.to_lowercase();
            doctor.name.to_lowercase().contains(&q) || doctor.specialty.to_lowercase().contains(&q)
        }
    };

    let specialty_match = match filters.specialty.as_deref() {
        None | Some("") => true,
        Some(specialty) => doctor.specialty == specialty,
    };

    let status_match = filters.status.map_or(true, |status| doctor.status == status);

    text_match && specialty_match && status_match
}

/// Checks the fields that are present. `None` means "not being changed".
fn validate_doctor_fields(
    name: Option<&String>,
    email: Option<&String>,
    specialty: Option<&String>,
    license_number: Option<&String>,
) -> BTreeMap<String, String> {
    let mut errors = BTreeMap::new();

    if name.is_some_and(|n| n.trim().is_empty()) {
        errors.insert("name".to_string(), "Doctor name is required.".to_string());
    }
    if email.is_some_and(|e| !e.contains('@')) {
        errors.insert("email".to_string(), "A valid email is required.".to_string());
    }
    if specialty.is_some_and(|s| s.trim().is_empty()) {
        errors.insert("specialty".to_string(), "Please select a specialty.".to_string());
    }
    if let Some(license) = license_number {
        if license.trim().is_empty() {
            errors.insert("license_number".to_string(), "License number is required.".to_string());
        } else if license.trim().chars().count() < MIN_LICENSE_LENGTH {
            errors.insert(
                "license_number".to_string(),
                format!("License number must be at least {} characters.", MIN_LICENSE_LENGTH),
            );
        }
    }

    errors
}
