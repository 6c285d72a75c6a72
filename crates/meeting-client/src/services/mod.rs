//! External service clients.
//!
//! - [`join_client`] - Join credential request (meeting + attendee descriptors)

pub mod join_client;

pub use join_client::{
    AttendeeDescriptor, HttpJoinClient, JoinCredentials, JoinCredentialsProvider,
    MeetingDescriptor,
};
