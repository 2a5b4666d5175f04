use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{Duration, NaiveDate, NaiveTime, Utc};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use doctor_cell::models::{hhmm, slot_key, Doctor, Slot};
use doctor_cell::services::{AvailabilityService, DoctorService};
use notification_cell::models::NewNotification;
use notification_cell::services::NotificationService;
use shared_config::AppConfig;
use shared_models::auth::{Role, Session};
use shared_utils::AppState;

use crate::models::{
    Appointment, AppointmentError, AppointmentStatus, AppointmentWithControl, BookingDraft,
    ConfirmBookingRequest, DateGroup, DoctorScheduleQuery, DoctorStatusUpdateRequest,
    DoctorSummary, RescheduleRequest, ScheduleView, SelectSlotRequest, SelectionOutcome,
    DEFAULT_REASON,
};
use crate::services::lifecycle::AppointmentLifecycleService;
use crate::services::repository::{AppointmentRepository, SlotMove, StoreAppointmentRepository};
use crate::services::validation::BookingValidationService;

/// Selection, confirmation and commit of bookings, plus the follow-up
/// actions patients, doctors and admins take on them.
pub struct BookingService {
    config: Arc<AppConfig>,
    repository: Arc<dyn AppointmentRepository>,
    doctors: DoctorService,
    availability: AvailabilityService,
    notifications: NotificationService,
    validator: BookingValidationService,
    lifecycle: AppointmentLifecycleService,
}

impl BookingService {
    pub fn new(state: &AppState) -> Self {
        Self::with_repository(state, Arc::new(StoreAppointmentRepository::new(&state.db)))
    }

    pub fn with_repository(state: &AppState, repository: Arc<dyn AppointmentRepository>) -> Self {
        Self {
            config: state.config.clone(),
            repository,
            doctors: DoctorService::new(&state.db),
            availability: AvailabilityService::new(&state.db, &state.config),
            notifications: NotificationService::new(&state.db),
            validator: BookingValidationService::new(),
            lifecycle: AppointmentLifecycleService::new(),
        }
    }

    // ==========================================================================
    // BOOKING WORKFLOW
    // ==========================================================================

    /// Step 1. Checks the slot and, when nobody is logged in, hands back the
    /// pending selection so it survives the trip through the login page.
    /// Nothing is reserved here.
    #[instrument(skip(self, session))]
    pub async fn select_slot(
        &self,
        session: Option<&Session>,
        request: SelectSlotRequest,
    ) -> Result<SelectionOutcome, AppointmentError> {
        let draft = self
            .build_draft(request.doctor_id, request.date, &request.time)
            .await?;

        match session {
            None => {
                debug!("Slot {} selected without a session, login required", draft.slot_id);
                Ok(SelectionOutcome::LoginRequired {
                    pending: request,
                    redirect: "/login".to_string(),
                })
            }
            Some(session) => {
                ensure_patient(session)?;
                Ok(SelectionOutcome::Ready { draft })
            }
        }
    }

    /// Steps 3 and 4. Validates the form, runs the simulated payment and
    /// commits the reservation atomically.
    #[instrument(skip(self, session, request), fields(patient = %session.email, doctor_id = request.doctor_id))]
    pub async fn confirm_booking(
        &self,
        session: &Session,
        request: ConfirmBookingRequest,
    ) -> Result<Appointment, AppointmentError> {
        ensure_patient(session)?;
        self.validator.validate_confirmation(&request)?;

        let draft = self
            .build_draft(request.doctor_id, request.date, &request.time)
            .await?;

        if self.config.payment_delay_ms > 0 {
            debug!("Processing payment for {}", draft.slot_id);
            tokio::time::sleep(StdDuration::from_millis(self.config.payment_delay_ms)).await;
        }

        let reason = request
            .patient
            .reason
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .unwrap_or(DEFAULT_REASON)
            .to_string();

        let appointment = Appointment {
            id: Uuid::new_v4(),
            doctor_id: draft.doctor.id,
            doctor: draft.doctor.name.clone(),
            specialty: draft.doctor.specialty.clone(),
            hospital: draft.doctor.hospital.clone(),
            date: draft.date,
            start_time: draft.start_time,
            end_time: draft.end_time,
            slot_id: draft.slot_id.clone(),
            status: AppointmentStatus::NotExamined,
            patient_name: request.patient.full_name(),
            patient_email: session.email.trim().to_lowercase(),
            user_id: Some(session.user_id.clone()),
            reason,
            fee: draft.fee,
            created_at: Utc::now(),
            updated_at: None,
        };

        let appointment = self.repository.reserve(appointment).await?;

        self.notify(NewNotification::booking(
            appointment.doctor_id,
            appointment.id,
            &appointment.patient_name,
            &appointment.time_range(),
            &appointment.date.to_string(),
        ))
        .await;

        info!("Booked {} for {}", appointment.slot_id, appointment.patient_email);
        Ok(appointment)
    }

    #[instrument(skip(self, session), fields(by = %session.email))]
    pub async fn cancel_appointment(
        &self,
        session: &Session,
        appointment_id: Uuid,
    ) -> Result<Appointment, AppointmentError> {
        let appointment = self.find_owned(session, appointment_id).await?;

        if !self.lifecycle.can_cancel(&appointment.status) {
            warn!("Cancel rejected, appointment {} is {}", appointment_id, appointment.status);
            return Err(AppointmentError::Locked(appointment.status));
        }

        let canceled = self
            .repository
            .update_status(appointment_id, AppointmentStatus::Canceled)
            .await?;

        self.notify(NewNotification::cancel(
            canceled.doctor_id,
            canceled.id,
            &session.name,
            &canceled.time_range(),
            &canceled.date.to_string(),
        ))
        .await;

        Ok(canceled)
    }

    #[instrument(skip(self, session, request), fields(by = %session.email))]
    pub async fn reschedule_appointment(
        &self,
        session: &Session,
        appointment_id: Uuid,
        request: RescheduleRequest,
    ) -> Result<Appointment, AppointmentError> {
        let appointment = self.find_owned(session, appointment_id).await?;
        if appointment.status.is_terminal() {
            return Err(AppointmentError::Locked(appointment.status));
        }

        let start_time = parse_time(&request.time)?;
        self.check_booking_window(request.date)?;
        let slot = self
            .find_slot(appointment.doctor_id, request.date, start_time)
            .await?;

        let (before, after) = self
            .repository
            .reschedule(
                appointment_id,
                SlotMove {
                    date: slot.slot_date,
                    start_time: slot.start_time,
                    end_time: slot.end_time,
                },
            )
            .await?;

        self.notify(NewNotification::reschedule(
            after.doctor_id,
            after.id,
            &after.patient_name,
            (&before.time_range(), &before.date.to_string()),
            (&after.time_range(), &after.date.to_string()),
        ))
        .await;

        Ok(after)
    }

    /// Doctor status control. Only "Examined" is reachable, and only once.
    #[instrument(skip(self, session, request), fields(doctor = ?session.doctor_id))]
    pub async fn update_status_by_doctor(
        &self,
        session: &Session,
        appointment_id: Uuid,
        request: DoctorStatusUpdateRequest,
    ) -> Result<AppointmentWithControl, AppointmentError> {
        let appointment = self
            .repository
            .find(appointment_id)
            .await
            .ok_or(AppointmentError::NotFound(appointment_id))?;

        if session.doctor_id != Some(appointment.doctor_id) {
            return Err(AppointmentError::Unauthorized);
        }

        self.lifecycle
            .validate_doctor_update(&appointment.status, &request.status, request.confirmed)?;

        let updated = self
            .repository
            .update_status(appointment_id, request.status)
            .await?;

        Ok(self.with_control(updated))
    }

    // ==========================================================================
    // LISTINGS
    // ==========================================================================

    /// The patient's own partition, keyed by session email.
    pub async fn my_appointments(&self, session: &Session) -> Vec<Appointment> {
        let mut appointments: Vec<Appointment> = self
            .repository
            .all()
            .await
            .into_iter()
            .filter(|a| a.belongs_to(&session.email))
            .collect();
        sort_by_schedule(&mut appointments);
        appointments
    }

    pub async fn get_appointment(
        &self,
        session: &Session,
        appointment_id: Uuid,
    ) -> Result<AppointmentWithControl, AppointmentError> {
        let appointment = self
            .repository
            .find(appointment_id)
            .await
            .ok_or(AppointmentError::NotFound(appointment_id))?;

        let allowed = match session.role {
            Role::Admin => true,
            Role::Doctor => session.doctor_id == Some(appointment.doctor_id),
            Role::Patient => appointment.belongs_to(&session.email),
        };
        if !allowed {
            return Err(AppointmentError::Unauthorized);
        }

        Ok(self.with_control(appointment))
    }

    /// Doctor schedule grouped by date. `day` view shows one date,
    /// `all` view every date.
    pub async fn doctor_schedule(
        &self,
        doctor_id: i64,
        query: &DoctorScheduleQuery,
    ) -> Vec<DateGroup> {
        let day = query.date.unwrap_or_else(AvailabilityService::today);

        let mut appointments: Vec<Appointment> = self
            .repository
            .all()
            .await
            .into_iter()
            .filter(|a| a.doctor_id == doctor_id)
            .filter(|a| query.view == ScheduleView::All || a.date == day)
            .filter(|a| query.status.map_or(true, |status| a.status == status))
            .collect();
        sort_by_schedule(&mut appointments);

        let mut groups: BTreeMap<NaiveDate, Vec<AppointmentWithControl>> = BTreeMap::new();
        for appointment in appointments {
            groups
                .entry(appointment.date)
                .or_default()
                .push(self.with_control(appointment));
        }

        groups
            .into_iter()
            .map(|(date, appointments)| DateGroup { date, appointments })
            .collect()
    }

    pub async fn all_appointments(&self) -> Vec<Appointment> {
        let mut appointments = self.repository.all().await;
        sort_by_schedule(&mut appointments);
        appointments
    }

    // ==========================================================================
    // HELPERS
    // ==========================================================================

    async fn build_draft(
        &self,
        doctor_id: i64,
        date: NaiveDate,
        time: &str,
    ) -> Result<BookingDraft, AppointmentError> {
        let doctor = self.doctors.get_active(doctor_id).await?;
        let start_time = parse_time(time)?;
        self.check_booking_window(date)?;
        let slot = self.find_slot(doctor_id, date, start_time).await?;

        if let Some(existing) = self
            .repository
            .find_by_doctor_date_time(doctor_id, date, start_time)
            .await
        {
            debug!("Slot {} is taken by appointment {}", slot.key(), existing.id);
            return Err(AppointmentError::SlotUnavailable);
        }

        Ok(BookingDraft {
            doctor: summary(&doctor),
            date,
            start_time: slot.start_time,
            end_time: slot.end_time,
            slot_id: slot_key(doctor_id, date, slot.start_time),
            fee: self.config.consultation_fee,
        })
    }

    fn check_booking_window(&self, date: NaiveDate) -> Result<(), AppointmentError> {
        let today = AvailabilityService::today();
        if self.availability.is_bookable_date(date, today) {
            return Ok(());
        }

        let last_day = today + Duration::days(self.config.slot_lookahead_days.max(1) as i64 - 1);
        Err(AppointmentError::OutsideBookingWindow {
            from: today,
            until: last_day,
        })
    }

    async fn find_slot(
        &self,
        doctor_id: i64,
        date: NaiveDate,
        start_time: NaiveTime,
    ) -> Result<Slot, AppointmentError> {
        self.availability
            .slots_for(doctor_id, date)
            .await?
            .into_iter()
            .find(|s| s.start_time == start_time)
            .ok_or_else(|| AppointmentError::SlotNotFound {
                date,
                time: start_time.format(hhmm::FORMAT).to_string(),
            })
    }

    /// Owner patient or admin.
    async fn find_owned(
        &self,
        session: &Session,
        appointment_id: Uuid,
    ) -> Result<Appointment, AppointmentError> {
        let appointment = self
            .repository
            .find(appointment_id)
            .await
            .ok_or(AppointmentError::NotFound(appointment_id))?;

        let allowed = session.is_admin()
            || (session.is(Role::Patient) && appointment.belongs_to(&session.email));
        if !allowed {
            warn!("{} tried to modify appointment {}", session.email, appointment_id);
            return Err(AppointmentError::Unauthorized);
        }

        Ok(appointment)
    }

    fn with_control(&self, appointment: Appointment) -> AppointmentWithControl {
        let control = self.lifecycle.doctor_control(&appointment.status);
        AppointmentWithControl { appointment, control }
    }

    /// Notification failures never undo a committed booking.
    async fn notify(&self, notification: NewNotification) {
        if let Err(e) = self.notifications.add(notification).await {
            error!("Failed to record doctor notification: {}", e);
        }
    }
}

fn ensure_patient(session: &Session) -> Result<(), AppointmentError> {
    if session.is(Role::Patient) {
        Ok(())
    } else {
        Err(AppointmentError::Unauthorized)
    }
}

fn parse_time(raw: &str) -> Result<NaiveTime, AppointmentError> {
    hhmm::parse(raw).ok_or_else(|| AppointmentError::InvalidTime(raw.to_string()))
}

fn summary(doctor: &Doctor) -> DoctorSummary {
    DoctorSummary {
        id: doctor.id,
        name: doctor.name.clone(),
        specialty: doctor.specialty.clone(),
        hospital: doctor.hospital.clone(),
        image: doctor.image.clone(),
    }
}

fn sort_by_schedule(appointments: &mut [Appointment]) {
    appointments.sort_by(|a, b| (a.date, a.start_time).cmp(&(b.date, b.start_time)));
}
