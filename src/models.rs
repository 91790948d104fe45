use chrono::NaiveDateTime;
use diesel::prelude::*;
use uuid::Uuid;

use crate::schema::*;

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = users)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub password_hash: String,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub contact: Option<String>,
    pub address: Option<String>,
    pub profile_picture: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = users)]
pub struct NewUser {
    pub id: Uuid,
    pub username: String,
    pub password_hash: String,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub contact: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations)]
#[diesel(table_name = permissions)]
#[diesel(belongs_to(User))]
pub struct Permission {
    pub id: Uuid,
    pub user_id: Uuid,
    pub visitor: bool,
    pub owner: bool,
    pub tenant: bool,
    pub sys_admin: bool,
    pub prop_manager: bool,
    pub site_manager: bool,
    pub admin: bool,
    pub account: bool,
    pub tech: bool,
    pub security: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Permission {
    /// Staff roles allowed to administer users, units, vehicles and settings.
    pub fn is_manager(&self) -> bool {
        self.sys_admin || self.prop_manager || self.site_manager || self.admin
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = permissions)]
pub struct NewPermission {
    pub id: Uuid,
    pub user_id: Uuid,
    pub visitor: bool,
    pub owner: bool,
    pub tenant: bool,
    pub sys_admin: bool,
    pub prop_manager: bool,
    pub site_manager: bool,
    pub admin: bool,
    pub account: bool,
    pub tech: bool,
    pub security: bool,
}

impl NewPermission {
    /// New accounts start as plain visitors.
    pub fn defaults_for(user_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            visitor: true,
            owner: false,
            tenant: false,
            sys_admin: false,
            prop_manager: false,
            site_manager: false,
            admin: false,
            account: false,
            tech: false,
            security: false,
        }
    }
}

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = buildings)]
pub struct Building {
    pub id: Uuid,
    pub block: String,
    pub level: String,
    pub unit: String,
    pub area: Option<String>,
    pub share_unit: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = buildings)]
pub struct NewBuilding {
    pub id: Uuid,
    pub block: String,
    pub level: String,
    pub unit: String,
    pub area: Option<String>,
    pub share_unit: Option<String>,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations)]
#[diesel(table_name = user_buildings)]
#[diesel(belongs_to(User))]
#[diesel(belongs_to(Building))]
pub struct UserBuilding {
    pub id: Uuid,
    pub user_id: Uuid,
    pub building_id: Uuid,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = user_buildings)]
pub struct NewUserBuilding {
    pub id: Uuid,
    pub user_id: Uuid,
    pub building_id: Uuid,
}

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = announcements)]
pub struct Announcement {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub attachment: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = announcements)]
pub struct NewAnnouncement {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub attachment: Option<String>,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations)]
#[diesel(table_name = vehicles)]
#[diesel(belongs_to(User, foreign_key = owner_id))]
pub struct Vehicle {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub plate_number: String,
    pub approved: bool,
    pub owner_comment: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = vehicles)]
pub struct NewVehicle {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub plate_number: String,
    pub approved: bool,
    pub owner_comment: Option<String>,
}

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = visitors)]
pub struct Visitor {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub visitor_id: Uuid,
    pub visitor_car: Option<String>,
    pub visit_start: NaiveDateTime,
    pub visit_end: NaiveDateTime,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = visitors)]
pub struct NewVisitor {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub visitor_id: Uuid,
    pub visitor_car: Option<String>,
    pub visit_start: NaiveDateTime,
    pub visit_end: NaiveDateTime,
}

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = settings)]
pub struct Settings {
    pub id: Uuid,
    pub property_name: String,
    pub visit_days: i32,
    pub visit_hours: i32,
    pub visit_duration: i32,
    pub owner_car: i32,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}
