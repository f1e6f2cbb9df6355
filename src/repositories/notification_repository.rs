use std::collections::HashMap;

use chrono::Utc;
use derive_new::new;
use diesel::prelude::*;
use tracing::{info, warn};

use crate::errors::problem::Problem;
use crate::models::{
        Group, Notification, NotificationCounts, NotificationKind, NotificationWithRelationships, Profile, Resolution,
        Room,
};
use crate::repositories::group_repository::transfer_profile_to_group;
use crate::schema::{groups, notifications, profiles, rooms};
use crate::DbPool;

#[derive(new, Debug, Clone)]
pub struct NotificationRepository {
        pool: DbPool,
}

impl NotificationRepository {
        pub fn find_all(&self) -> Result<Vec<NotificationWithRelationships>, Problem> {
                let mut connection = self.pool.get()?;

                let notifications = notifications::table
                        .order_by((notifications::created_at.desc(), notifications::id.desc()))
                        .load::<Notification>(&mut connection)?;

                let profile_ids: Vec<i64> = notifications.iter().filter_map(|n| n.profile_id).collect();
                let group_ids: Vec<i64> = notifications.iter().filter_map(|n| n.group_id).collect();
                let room_ids: Vec<i64> = notifications.iter().filter_map(|n| n.room_id).collect();

                let profile_map: HashMap<i64, Profile> = profiles::table
                        .filter(profiles::id.eq_any(&profile_ids))
                        .load::<Profile>(&mut connection)?
                        .into_iter()
                        .map(|p| (p.id, p))
                        .collect();
                let group_map: HashMap<i64, String> = groups::table
                        .filter(groups::id.eq_any(&group_ids))
                        .load::<Group>(&mut connection)?
                        .into_iter()
                        .map(|g| (g.id, g.name))
                        .collect();
                let room_map: HashMap<i64, String> = rooms::table
                        .filter(rooms::id.eq_any(&room_ids))
                        .load::<Room>(&mut connection)?
                        .into_iter()
                        .map(|r| (r.id, r.name))
                        .collect();

                Ok(notifications
                        .into_iter()
                        .map(|notification| NotificationWithRelationships {
                                profile: notification.profile_id.and_then(|id| profile_map.get(&id).cloned()),
                                group_name: notification.group_id.and_then(|id| group_map.get(&id).cloned()),
                                room_name: notification.room_id.and_then(|id| room_map.get(&id).cloned()),
                                notification,
                        })
                        .collect())
        }

        pub fn counts(&self) -> Result<NotificationCounts, Problem> {
                let mut connection = self.pool.get()?;

                let total = notifications::table.count().get_result::<i64>(&mut connection)?;
                let unread = notifications::table
                        .filter(notifications::read_status.eq(false))
                        .count()
                        .get_result::<i64>(&mut connection)?;
                let pending_requests = notifications::table
                        .filter(notifications::kind.eq(NotificationKind::GroupRequest.as_str()))
                        .filter(notifications::resolved.eq(false))
                        .count()
                        .get_result::<i64>(&mut connection)?;

                Ok(NotificationCounts {
                        total,
                        unread,
                        pending_requests,
                })
        }

        pub fn save(&self, notification: Notification) -> Result<Notification, Problem> {
                let mut connection = self.pool.get()?;

                Ok(diesel::insert_into(notifications::table)
                        .values(&notification)
                        .get_result(&mut connection)?)
        }

        /// Records a request to move a profile into a group. The default message names both.
        pub fn save_group_request(&self, mut notification: Notification) -> Result<Notification, Problem> {
                let mut connection = self.pool.get()?;

                connection.transaction::<_, Problem, _>(|connection| {
                        let profile = match notification.profile_id {
                                Some(id) => profiles::table.find(id).first::<Profile>(connection).optional()?,
                                None => None,
                        };
                        let group = match notification.group_id {
                                Some(id) => groups::table.find(id).first::<Group>(connection).optional()?,
                                None => None,
                        };
                        let (Some(profile), Some(group)) = (profile, group) else {
                                return Err(Problem::NotFound("Profile or group not found".to_string()));
                        };

                        if notification.message.trim().is_empty() {
                                notification.message =
                                        format!("{} wants to join the \"{}\" group", profile.full_name(), group.name);
                        }

                        Ok(diesel::insert_into(notifications::table)
                                .values(&notification)
                                .get_result(connection)?)
                })
        }

        pub fn mark_read(&self, notification_id: i64) -> Result<Notification, Problem> {
                let mut connection = self.pool.get()?;

                diesel::update(notifications::table.find(notification_id))
                        .set((
                                notifications::read_status.eq(true),
                                notifications::updated_at.eq(Utc::now().naive_utc()),
                        ))
                        .get_result::<Notification>(&mut connection)
                        .optional()?
                        .ok_or(Problem::NotFound("Notification not found".to_string()))
        }

        pub fn mark_all_read(&self) -> Result<usize, Problem> {
                let mut connection = self.pool.get()?;

                Ok(diesel::update(notifications::table.filter(notifications::read_status.eq(false)))
                        .set((
                                notifications::read_status.eq(true),
                                notifications::updated_at.eq(Utc::now().naive_utc()),
                        ))
                        .execute(&mut connection)?)
        }

        /// Settles a pending group request. Approval moves the profile into the requested
        /// group in the same transaction, so the profile never ends up in two groups.
        pub fn resolve(&self, notification_id: i64, resolution: Resolution) -> Result<Notification, Problem> {
                let mut connection = self.pool.get()?;

                connection.transaction::<_, Problem, _>(|connection| {
                        let notification = notifications::table
                                .find(notification_id)
                                .filter(notifications::kind.eq(NotificationKind::GroupRequest.as_str()))
                                .for_update()
                                .get_result::<Notification>(connection)
                                .optional()?
                                .ok_or(Problem::NotFound("Group request notification not found".to_string()))?;

                        if notification.resolved {
                                return Err(Problem::Conflict("Request has already been resolved".to_string()));
                        }

                        if resolution == Resolution::Approved {
                                match (notification.profile_id, notification.group_id) {
                                        (Some(profile_id), Some(group_id)) => {
                                                transfer_profile_to_group(connection, profile_id, group_id)?;
                                                info!("approved request {notification_id}: profile {profile_id} joins group {group_id}");
                                        }
                                        _ => warn!("request {notification_id} lost its profile or group, nothing to move"),
                                }
                        }

                        let now = Utc::now().naive_utc();
                        Ok(diesel::update(notifications::table.find(notification_id))
                                .set((
                                        notifications::resolved.eq(true),
                                        notifications::resolution.eq(Some(resolution.as_str())),
                                        notifications::resolved_at.eq(Some(now)),
                                        notifications::read_status.eq(true),
                                        notifications::updated_at.eq(now),
                                ))
                                .get_result::<Notification>(connection)?)
                })
        }

        pub fn delete(&self, notification_id: i64) -> Result<(), Problem> {
                let mut connection = self.pool.get()?;

                let deleted = diesel::delete(notifications::table.find(notification_id)).execute(&mut connection)?;
                if deleted == 0 {
                        return Err(Problem::NotFound("Notification not found".to_string()));
                }

                Ok(())
        }

        pub fn delete_all(&self) -> Result<usize, Problem> {
                let mut connection = self.pool.get()?;

                Ok(diesel::delete(notifications::table).execute(&mut connection)?)
        }
}
