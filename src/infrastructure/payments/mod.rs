pub mod card_gateway;
