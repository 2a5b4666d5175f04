use std::collections::{BTreeMap, HashMap};

use chrono::Utc;
use serde_json::Value;
use tracing::{debug, info};

use shared_database::{keys, Database};

use crate::models::{
    Patient, PatientError, PatientSearchQuery, PatientSummary, UpdatePatientRequest,
};

pub struct PatientService {
    db: Database,
}

impl PatientService {
    pub fn new(db: &Database) -> Self {
        Self { db: db.clone() }
    }

    pub async fn list_all(&self) -> Vec<Patient> {
        self.db.collection(keys::PATIENTS).await
    }

    pub async fn get(&self, patient_id: i64) -> Result<Patient, PatientError> {
        self.list_all()
            .await
            .into_iter()
            .find(|p| p.id == patient_id)
            .ok_or(PatientError::NotFound(patient_id))
    }

    /// Admin listing with age and booking count per patient.
    pub async fn search(&self, query: &PatientSearchQuery) -> Vec<PatientSummary> {
        let counts = self.appointment_counts().await;
        let today = Utc::now().date_naive();

        self.list_all()
            .await
            .into_iter()
            .filter(|p| matches_query(p, query))
            .map(|p| PatientSummary {
                age: p.age_on(today),
                appointment_count: counts.get(&p.email.to_lowercase()).copied().unwrap_or(0),
                patient: p.profile(),
            })
            .collect()
    }

    pub async fn summary(&self, patient_id: i64) -> Result<PatientSummary, PatientError> {
        let patient = self.get(patient_id).await?;
        let counts = self.appointment_counts().await;

        Ok(PatientSummary {
            age: patient.age_on(Utc::now().date_naive()),
            appointment_count: counts
                .get(&patient.email.to_lowercase())
                .copied()
                .unwrap_or(0),
            patient: patient.profile(),
        })
    }

    pub async fn update(
        &self,
        patient_id: i64,
        request: UpdatePatientRequest,
    ) -> Result<Patient, PatientError> {
        let errors = validate_patient_fields(&request);
        if !errors.is_empty() {
            return Err(PatientError::InvalidFields(errors));
        }

        let patient = self
            .db
            .transact(|tx| {
                let mut patients: Vec<Patient> = tx.collection(keys::PATIENTS);

                if let Some(email) = &request.email {
                    let email = email.trim().to_lowercase();
                    if patients
                        .iter()
                        .any(|p| p.id != patient_id && p.email.eq_ignore_ascii_case(&email))
                    {
                        return Err(PatientError::DuplicateEmail(email));
                    }
                }

                let patient = patients
                    .iter_mut()
                    .find(|p| p.id == patient_id)
                    .ok_or(PatientError::NotFound(patient_id))?;

                if let Some(name) = &request.name {
                    patient.name = name.trim().to_string();
                }
                if let Some(email) = &request.email {
                    patient.email = email.trim().to_lowercase();
                }
                if let Some(password) = &request.password {
                    patient.password = password.clone();
                }
                if let Some(phone) = &request.phone {
                    patient.phone = phone.trim().to_string();
                }
                if request.dob.is_some() {
                    patient.dob = request.dob;
                }
                if let Some(gender) = &request.gender {
                    patient.gender = Some(gender.trim().to_string());
                }

                let updated = patient.clone();
                tx.put_collection(keys::PATIENTS, &patients)?;
                Ok(updated)
            })
            .await?;

        info!("Updated patient {}", patient.id);
        Ok(patient)
    }

    /// Removes the patient record. Their appointments stay for the doctor's history.
    pub async fn delete(&self, patient_id: i64) -> Result<Patient, PatientError> {
        let removed = self
            .db
            .transact(|tx| {
                let mut patients: Vec<Patient> = tx.collection(keys::PATIENTS);
                let index = patients
                    .iter()
                    .position(|p| p.id == patient_id)
                    .ok_or(PatientError::NotFound(patient_id))?;
                let removed = patients.remove(index);
                tx.put_collection(keys::PATIENTS, &patients)?;
                Ok::<_, PatientError>(removed)
            })
            .await?;

        info!("Deleted patient {} ({})", removed.id, removed.email);
        Ok(removed)
    }

    /// Appointment count per lowercase patient email.
    async fn appointment_counts(&self) -> HashMap<String, usize> {
        let mut counts = HashMap::new();
        for appointment in self.db.collection::<Value>(keys::APPOINTMENTS).await {
            if let Some(email) = appointment.get("patient_email").and_then(Value::as_str) {
                *counts.entry(email.trim().to_lowercase()).or_insert(0) += 1;
            }
        }
        debug!("Counted appointments for {} patients", counts.len());
        counts
    }
}

fn matches_query(patient: &Patient, query: &PatientSearchQuery) -> bool {
    if let Some(q) = query.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
        let q = q.to_lowercase();
        let hit = patient.name.to_lowercase().contains(&q)
            || patient.email.to_lowercase().contains(&q)
            || patient.phone.contains(&q);
        if !hit {
            return false;
        }
    }

    if let Some(gender) = query.gender.as_deref().filter(|g| !g.is_empty()) {
        if !patient
            .gender
            .as_deref()
            .is_some_and(|g| g.eq_ignore_ascii_case(gender))
        {
            return false;
        }
    }

    true
}

fn validate_patient_fields(request: &UpdatePatientRequest) -> BTreeMap<String, String> {
    let mut errors = BTreeMap::new();

    if request.name.as_ref().is_some_and(|n| n.trim().is_empty()) {
        errors.insert("name".into(), "Name is required.".into());
    }
    if request.email.as_ref().is_some_and(|e| !e.contains('@')) {
        errors.insert("email".into(), "Please enter a valid email address.".into());
    }
    if request
        .phone
        .as_ref()
        .is_some_and(|p| !p.trim().chars().all(|c| c.is_ascii_digit()))
    {
        errors.insert("phone".into(), "Phone number must contain digits only.".into());
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn patient(id: i64, name: &str, email: &str, gender: &str) -> Patient {
        Patient {
            id,
            name: name.to_string(),
            email: email.to_string(),
            password: String::new(),
            phone: "0900000000".to_string(),
            dob: NaiveDate::from_ymd_opt(1990, 4, 12),
            gender: Some(gender.to_string()),
        }
    }

    #[test]
    fn test_query_matching() {
        let binh = patient(1, "Binh Tran", "binh@clinic.test", "male");

        let by_name = PatientSearchQuery {
            q: Some("tran".to_string()),
            gender: None,
        };
        let by_gender = PatientSearchQuery {
            q: None,
            gender: Some("Female".to_string()),
        };

        assert!(matches_query(&binh, &by_name));
        assert!(!matches_query(&binh, &by_gender));
        assert!(matches_query(&binh, &PatientSearchQuery::default()));
    }

    #[test]
    fn test_age() {
        let binh = patient(1, "Binh Tran", "binh@clinic.test", "male");
        let today = NaiveDate::from_ymd_opt(2025, 4, 11).unwrap();
        assert_eq!(binh.age_on(today), Some(34));
    }

    #[test]
    fn test_phone_must_be_digits() {
        let request = UpdatePatientRequest {
            phone: Some("09-12".to_string()),
            ..Default::default()
        };
        assert!(validate_patient_fields(&request).contains_key("phone"));
    }
}
