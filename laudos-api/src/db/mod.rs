//! Query layer
//!
//! Every owned-record query takes the requesting user's id and filters on it;
//! a record owned by someone else is reported as missing.

pub mod frases;
pub mod metodos;
pub mod modelos;
pub mod users;
pub mod variaveis;
